//! A virtualized build listing
//!
//! Renders a fixed window of rows over a longer list of builds. Scrolling
//! rewrites the text of the existing row nodes instead of creating new ones,
//! the way virtual-scrolling grids recycle their rows.

use std::sync::{Arc, Mutex};
use ticketmark::{Document, Identifier, NodeId, NodeSpec, SharedDocument, TicketExtractor};

/// Listing line for build `n`, carrying identifier `ECP-{1000 + n}`
pub fn build_line(n: usize) -> String {
    format!("#20260116.{} • feat: ECP-{} change number {}", n, 1000 + n, n)
}

fn row(text: &str) -> NodeSpec {
    NodeSpec::element("tr")
        .class("run-row")
        .child(NodeSpec::element("td").child(NodeSpec::element("a").with_text(text)))
        .child(NodeSpec::element("td").with_text("Succeeded"))
}

fn link_of(doc: &Document, tr: NodeId) -> NodeId {
    let cell = doc.element_children(tr)[0];
    doc.element_children(cell)[0]
}

pub struct VirtualList {
    document: SharedDocument,
    extractor: TicketExtractor,
    builds: Vec<String>,
    table: NodeId,
    links: Vec<NodeId>,
    offset: usize,
}

impl VirtualList {
    /// `body > div.app > table.build-list` showing the first `window` builds
    pub fn new(builds: Vec<String>, window: usize) -> Self {
        let window = window.min(builds.len());
        let mut table = NodeSpec::element("table").class("build-list");
        for line in &builds[..window] {
            table = table.child(row(line));
        }
        let doc = Document::from_specs(&[NodeSpec::element("div").class("app").child(table)]).unwrap();
        let app = doc.element_children(doc.body())[0];
        let table = doc.element_children(app)[0];
        let links = doc
            .element_children(table)
            .into_iter()
            .map(|tr| link_of(&doc, tr))
            .collect();

        Self {
            document: Arc::new(Mutex::new(doc)),
            extractor: TicketExtractor::new(["ECP", "IP"]).unwrap(),
            builds,
            table,
            links,
            offset: 0,
        }
    }

    /// `count` numbered builds, `window` rows
    pub fn numbered(count: usize, window: usize) -> Self {
        Self::new((0..count).map(build_line).collect(), window)
    }

    pub fn document(&self) -> SharedDocument {
        self.document.clone()
    }

    pub fn links(&self) -> &[NodeId] {
        &self.links
    }

    pub fn window(&self) -> usize {
        self.links.len()
    }

    pub fn max_offset(&self) -> usize {
        self.builds.len() - self.window()
    }

    pub fn visible(&self) -> &[String] {
        &self.builds[self.offset..self.offset + self.window()]
    }

    pub fn visible_ids(&self) -> Vec<Identifier> {
        self.visible()
            .iter()
            .filter_map(|line| self.extractor.extract(line))
            .collect()
    }

    /// Show build `offset` in the first row by recycling the row nodes
    pub fn scroll_to(&mut self, offset: usize) -> Vec<NodeId> {
        self.offset = offset.min(self.max_offset());
        let mut doc = self.document.lock().unwrap();
        for (i, link) in self.links.iter().enumerate() {
            doc.set_text(*link, self.builds[self.offset + i].clone()).unwrap();
        }
        self.links.clone()
    }

    /// Throw the rows away and render the window again as new nodes
    pub fn rerender(&mut self) -> Vec<NodeId> {
        let mut doc = self.document.lock().unwrap();
        for tr in doc.element_children(self.table) {
            doc.remove(tr).unwrap();
        }
        let lines: Vec<String> = self.visible().to_vec();
        self.links = lines
            .iter()
            .map(|line| {
                let tr = doc.insert_spec(self.table, &row(line)).unwrap();
                link_of(&doc, tr)
            })
            .collect();
        self.links.clone()
    }

    /// Grow the list by one build rendered in a new row at the end
    pub fn append(&mut self, line: String) -> NodeId {
        let mut doc = self.document.lock().unwrap();
        let tr = doc.insert_spec(self.table, &row(&line)).unwrap();
        let link = link_of(&doc, tr);
        self.builds.insert(self.offset + self.links.len(), line);
        self.links.push(link);
        tr
    }
}

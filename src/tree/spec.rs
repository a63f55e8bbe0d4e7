//! Declarative node specs and markup rendering
//!
//! `NodeSpec` is the JSON shape accepted by the CLI and used by tests to
//! build fixtures:
//!
//! ```json
//! {"tag": "tr", "class": "run-row", "children": [
//!     {"tag": "td", "children": ["#20260116.2 • feat: ECP-4849"]}
//! ]}
//! ```

use super::document::{Document, TreeResult};
use super::node::{Element, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A subtree to insert: a bare string is a text node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element {
        tag: String,
        /// Space-separated class list
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeSpec>,
    },
}

impl NodeSpec {
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            class: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn class(mut self, value: impl Into<String>) -> Self {
        if let Self::Element { class, .. } = &mut self {
            *class = Some(value.into());
        }
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    pub fn child(mut self, spec: NodeSpec) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(spec);
        }
        self
    }

    /// Shorthand for a text child
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.child(Self::Text(text.into()))
    }
}

impl Document {
    /// Build `spec` and append it under `parent`
    pub fn insert_spec(&mut self, parent: NodeId, spec: &NodeSpec) -> TreeResult<NodeId> {
        match spec {
            NodeSpec::Text(text) => self.append_text(parent, text.clone()),
            NodeSpec::Element {
                tag,
                class,
                attrs,
                children,
            } => {
                let mut element = Element::new(tag.as_str());
                if let Some(class) = class {
                    element.classes = class.split_whitespace().map(str::to_string).collect();
                }
                element.attributes = attrs.clone();
                let id = self.append_element(parent, element)?;
                for child in children {
                    self.insert_spec(id, child)?;
                }
                Ok(id)
            }
        }
    }

    /// Build a document whose body holds `specs`
    pub fn from_specs(specs: &[NodeSpec]) -> TreeResult<Self> {
        let mut doc = Self::new();
        let body = doc.body();
        for spec in specs {
            doc.insert_spec(body, spec)?;
        }
        Ok(doc)
    }

    /// Render the subtree at `id` as indented markup
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render(id, 0, &mut out);
        out
    }

    fn render(&self, id: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self.kind(id) {
            Some(NodeKind::Text(text)) => {
                out.push_str(&indent);
                out.push_str(text);
                out.push('\n');
            }
            Some(NodeKind::Element(el)) => {
                out.push_str(&indent);
                out.push('<');
                out.push_str(&el.tag);
                if !el.classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", el.classes.join(" ")));
                }
                for (name, value) in &el.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, value));
                }
                out.push_str(">\n");
                for child in self.children(id) {
                    self.render(*child, depth + 1, out);
                }
                out.push_str(&format!("{}</{}>\n", indent, el.tag));
            }
            None => {}
        }
    }
}

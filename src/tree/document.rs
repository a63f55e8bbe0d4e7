//! Document: arena of nodes rooted at an `html` element

use super::node::{Element, NodeEntry, NodeId, NodeKind};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while mutating the tree
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node is not an element: {0}")]
    NotAnElement(NodeId),

    #[error("Inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("The document root cannot be detached")]
    RootDetach,
}

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// A live document
///
/// Nodes created with [`Document::create_element`] start detached; only
/// nodes reachable from [`Document::root`] are part of the live tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: HashMap<NodeId, NodeEntry>,
    next_id: u64,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty `html > (head, body)` document
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: HashMap::new(),
            next_id: 0,
            root: NodeId::from_raw(0),
            head: NodeId::from_raw(0),
            body: NodeId::from_raw(0),
        };
        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.root = root;
        doc.head = head;
        doc.body = body;
        // Freshly created, so neither link can fail
        let _ = doc.append_child(root, head);
        let _ = doc.append_child(root, body);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, NodeEntry::new(kind));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.allocate(NodeKind::Element(Element::new(tag)))
    }

    /// Create a detached element from a prepared [`Element`]
    pub fn create(&mut self, element: Element) -> NodeId {
        self.allocate(NodeKind::Element(element))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.allocate(NodeKind::Text(text.into()))
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> TreeResult<NodeId> {
        let id = self.create(element);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> TreeResult<NodeId> {
        let id = self.create_text(text);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if self.element(parent).is_none() {
            return Err(if self.nodes.contains_key(&parent) {
                TreeError::NotAnElement(parent)
            } else {
                TreeError::NodeNotFound(parent)
            });
        }
        if !self.nodes.contains_key(&child) {
            return Err(TreeError::NodeNotFound(child));
        }
        if child == self.root {
            return Err(TreeError::RootDetach);
        }
        if child == parent || self.ancestors(parent).contains(&child) {
            return Err(TreeError::Cycle { parent, child });
        }

        self.unlink(child);
        if let Some(entry) = self.nodes.get_mut(&child) {
            entry.parent = Some(parent);
        }
        if let Some(entry) = self.nodes.get_mut(&parent) {
            entry.children.push(child);
        }
        Ok(())
    }

    /// Detach `id` from its parent without dropping it
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        if id == self.root {
            return Err(TreeError::RootDetach);
        }
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::NodeNotFound(id));
        }
        self.unlink(id);
        Ok(())
    }

    /// Detach `id` and drop it together with its whole subtree
    pub fn remove(&mut self, id: NodeId) -> TreeResult<()> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&next) {
                stack.extend(entry.children);
            }
        }
        Ok(())
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) -> TreeResult<()> {
        let children = self
            .nodes
            .get(&id)
            .map(|e| e.children.clone())
            .ok_or(TreeError::NodeNotFound(id))?;
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Replace the children of `id` with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> TreeResult<()> {
        match self.nodes.get_mut(&id).map(|e| &mut e.kind) {
            Some(NodeKind::Text(existing)) => {
                *existing = text.into();
                Ok(())
            }
            Some(NodeKind::Element(_)) => {
                self.clear_children(id)?;
                self.append_text(id, text)?;
                Ok(())
            }
            None => Err(TreeError::NodeNotFound(id)),
        }
    }

    fn unlink(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(&id).and_then(|e| e.parent.take());
        if let Some(parent) = parent {
            if let Some(entry) = self.nodes.get_mut(&parent) {
                entry.children.retain(|c| *c != id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id).map(|e| &e.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.kind(id).and_then(NodeKind::as_element)
    }

    /// Lowercase tag name, `None` for text nodes
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attribute(name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|e| e.parent)
    }

    /// All children, text nodes included
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element children only
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    pub fn child_element_count(&self, id: NodeId) -> usize {
        self.children(id)
            .iter()
            .filter(|c| self.element(**c).is_some())
            .count()
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).last() == Some(&self.root)
    }

    /// Concatenated text of every descendant text node, in document order
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(entry) = self.nodes.get(&id) else {
            return;
        };
        match &entry.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for child in &entry.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Descendant elements of `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.element(next).is_none() {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every live element in document order, root included
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendants(self.root));
        out
    }

    /// Nearest of `id` and its ancestors satisfying `pred`
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.element(*n).is_some_and(&pred))
    }

    /// Number of nodes held in the arena, detached ones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

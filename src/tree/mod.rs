//! Document tree the reconciliation engine works against
//!
//! An arena of element and text nodes with parent links. Hosts project their
//! live tree into a [`Document`] (or drive one directly) and the engine reads
//! text, walks ancestors and inserts annotation elements through it.

mod document;
mod node;
mod spec;

#[cfg(test)]
mod tests;

pub use document::{Document, TreeError, TreeResult};
pub use node::{Element, NodeId, NodeKind};
pub use spec::NodeSpec;

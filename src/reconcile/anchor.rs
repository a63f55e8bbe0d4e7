//! AnchorSelector: picks one node per identifier to host its annotation
//!
//! Selection is split in two: a traversal that observes every eligible node
//! ([`AnchorSelector::observe`]) and pure ranking ([`rank`], [`pick_best`])
//! that turns observations into at most one candidate per identifier.

use super::annotate::{AnnotationReconciler, BADGE_CLASS};
use crate::ticket::{Identifier, TicketExtractor};
use crate::tree::{Document, Element, NodeId};
use std::collections::{HashMap, HashSet};

/// Nodes with more text than this are too coarse to anchor
pub const CONTAINER_TEXT_MAX: usize = 5000;
/// Leaf and cell text ceiling
pub const LEAF_TEXT_MAX: usize = 500;
/// Leaves need more text than this
pub const LEAF_TEXT_MIN: usize = 5;
/// Leaf text ceiling when only the build context speaks for it
pub const CONTEXT_LEAF_TEXT_MAX: usize = 300;
/// Child element ceiling for bounded containers
pub const BOUNDED_CHILDREN_MAX: usize = 15;
/// Text ceiling in the relaxed pass
pub const RELAXED_TEXT_MAX: usize = 1000;
/// Child element ceiling in the relaxed pass for nodes without the pattern
pub const RELAXED_CHILDREN_MAX: usize = 10;

/// Tags that never host an annotation
pub const EXCLUDED_TAGS: [&str; 9] = [
    "html", "body", "head", "script", "style", "noscript", "meta", "link", "title",
];

const BUILD_CLASS_HINTS: [&str; 4] = ["build", "artifact", "pipeline", "run"];
const BUILD_TESTID_HINTS: [&str; 2] = ["build", "run"];

/// Structural role of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Link or inline span
    Leaf,
    /// Table row
    Row,
    /// Table cell
    Cell,
    /// Anything else
    Container,
}

impl ShapeKind {
    pub fn of(element: &Element) -> Self {
        match element.tag.as_str() {
            "a" | "span" => Self::Leaf,
            "tr" => Self::Row,
            "td" | "th" => Self::Cell,
            _ => Self::Container,
        }
    }
}

/// Everything ranking needs to know about a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeShape {
    pub kind: ShapeKind,
    /// Length of the node's full text, in characters
    pub text_len: usize,
    pub child_count: usize,
    /// Text matches the artifact listing pattern
    pub artifact: bool,
    /// Node sits inside a build/pipeline listing
    pub build_context: bool,
}

/// Anchor confidence, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    ArtifactLeaf,
    ArtifactTabular,
    ArtifactContainer,
    ContextLeaf,
    ContextRow,
    /// Relaxed pass: artifact pattern in a bounded node
    RelaxedArtifact,
    /// Relaxed pass: any small node
    RelaxedBounded,
}

/// Which criteria to rank against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criteria {
    Strict,
    Relaxed,
}

/// Priority for a node shape, `None` if it is not a candidate
pub fn rank(shape: &NodeShape, criteria: Criteria) -> Option<Priority> {
    match criteria {
        Criteria::Strict => {
            let leaf = shape.kind == ShapeKind::Leaf
                && shape.text_len > LEAF_TEXT_MIN
                && shape.text_len < LEAF_TEXT_MAX;
            let row = shape.kind == ShapeKind::Row;
            let cell = shape.kind == ShapeKind::Cell && shape.text_len < LEAF_TEXT_MAX;

            if shape.artifact && leaf {
                Some(Priority::ArtifactLeaf)
            } else if shape.artifact && (row || cell) {
                Some(Priority::ArtifactTabular)
            } else if shape.artifact
                && shape.text_len < LEAF_TEXT_MAX
                && shape.child_count <= BOUNDED_CHILDREN_MAX
            {
                Some(Priority::ArtifactContainer)
            } else if leaf && shape.build_context && shape.text_len < CONTEXT_LEAF_TEXT_MAX {
                Some(Priority::ContextLeaf)
            } else if row && shape.build_context {
                Some(Priority::ContextRow)
            } else {
                None
            }
        }
        Criteria::Relaxed => {
            if shape.text_len <= LEAF_TEXT_MIN || shape.text_len >= RELAXED_TEXT_MAX {
                None
            } else if shape.artifact && shape.child_count <= BOUNDED_CHILDREN_MAX {
                Some(Priority::RelaxedArtifact)
            } else if shape.child_count <= RELAXED_CHILDREN_MAX {
                Some(Priority::RelaxedBounded)
            } else {
                None
            }
        }
    }
}

/// A node that yielded an identifier and passed the exclusion filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub node: NodeId,
    pub identifier: Identifier,
    pub shape: NodeShape,
    /// Position in document order
    pub order: usize,
}

/// A ranked anchor, valid for one pass only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub node: NodeId,
    pub identifier: Identifier,
    pub priority: Priority,
    pub kind: ShapeKind,
    pub order: usize,
}

/// Rank observations and keep the best candidate per identifier
///
/// Ties go to document order. The result is sorted best first.
pub fn pick_best(observations: &[Observation], criteria: Criteria) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = observations
        .iter()
        .filter_map(|obs| {
            rank(&obs.shape, criteria).map(|priority| Candidate {
                node: obs.node,
                identifier: obs.identifier.clone(),
                priority,
                kind: obs.shape.kind,
                order: obs.order,
            })
        })
        .collect();
    ranked.sort_by_key(|c| (c.priority, c.order));

    let mut seen = HashSet::new();
    ranked.retain(|c| seen.insert(c.identifier.clone()));
    ranked
}

/// Structural filter shared by full and re-attach scans
pub(crate) fn is_excluded(doc: &Document, node: NodeId, text_len: usize) -> bool {
    let Some(element) = doc.element(node) else {
        return true;
    };
    if EXCLUDED_TAGS.contains(&element.tag.as_str()) || element.has_class(BADGE_CLASS) {
        return true;
    }
    if text_len > CONTAINER_TEXT_MAX {
        return true;
    }
    matches!(doc.parent(node), Some(p) if p == doc.body() || p == doc.root())
}

fn in_build_context(doc: &Document, node: NodeId) -> bool {
    doc.closest(node, |el| {
        el.is("table")
            || BUILD_CLASS_HINTS.iter().any(|hint| el.class_contains(hint))
            || el
                .attribute("data-testid")
                .is_some_and(|id| BUILD_TESTID_HINTS.iter().any(|hint| id.contains(hint)))
    })
    .is_some()
}

/// Walks the live tree and ranks anchor candidates
#[derive(Debug, Clone)]
pub struct AnchorSelector {
    extractor: TicketExtractor,
}

impl AnchorSelector {
    pub fn new(extractor: TicketExtractor) -> Self {
        Self { extractor }
    }

    /// Observe every eligible node whose identifier is not yet validly
    /// annotated
    ///
    /// Validity is checked through the reconciler, which removes orphaned
    /// annotations it comes across.
    pub fn observe(
        &self,
        doc: &mut Document,
        reconciler: &AnnotationReconciler,
        build_page: bool,
    ) -> Vec<Observation> {
        let mut observations = Vec::new();
        let mut annotated: HashMap<Identifier, bool> = HashMap::new();

        for (order, node) in doc.elements().into_iter().enumerate() {
            if !doc.is_connected(node) {
                continue;
            }
            let text = doc.text_content(node);
            let text_len = text.chars().count();
            if is_excluded(doc, node, text_len) {
                continue;
            }
            let Some(identifier) = self.extractor.extract(&text) else {
                continue;
            };
            let has_annotation = *annotated
                .entry(identifier.clone())
                .or_insert_with(|| reconciler.has_valid_annotation(doc, &identifier));
            if has_annotation {
                continue;
            }

            let Some(element) = doc.element(node) else {
                continue;
            };
            let shape = NodeShape {
                kind: ShapeKind::of(element),
                text_len,
                child_count: doc.child_element_count(node),
                artifact: self.extractor.is_artifact_listing(&text),
                build_context: build_page || in_build_context(doc, node),
            };
            observations.push(Observation {
                node,
                identifier,
                shape,
                order,
            });
        }
        observations
    }

    /// One pass of anchor selection, best candidates first
    ///
    /// Falls back to relaxed criteria only when strict criteria produce no
    /// candidate at all for the whole tree.
    pub fn select(
        &self,
        doc: &mut Document,
        reconciler: &AnnotationReconciler,
        build_page: bool,
    ) -> Vec<Candidate> {
        let observations = self.observe(doc, reconciler, build_page);
        let strict = pick_best(&observations, Criteria::Strict);
        if !strict.is_empty() {
            return strict;
        }
        let relaxed = pick_best(&observations, Criteria::Relaxed);
        if !relaxed.is_empty() {
            tracing::debug!(count = relaxed.len(), "no strict anchors, using relaxed criteria");
        }
        relaxed
    }

    /// Narrow scan for re-attachment: links, spans, table parts and
    /// build-listing containers, first node per identifier
    pub fn reattach_targets(&self, doc: &Document) -> Vec<(NodeId, Identifier)> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for node in doc.elements() {
            let Some(element) = doc.element(node) else {
                continue;
            };
            let narrow = matches!(element.tag.as_str(), "a" | "span" | "tr" | "td" | "th")
                || ["artifact", "build", "run"]
                    .iter()
                    .any(|hint| element.class_contains(hint));
            if !narrow {
                continue;
            }
            let text = doc.text_content(node);
            if is_excluded(doc, node, text.chars().count()) {
                continue;
            }
            if let Some(identifier) = self.extractor.extract(&text) {
                if seen.insert(identifier.clone()) {
                    targets.push((node, identifier));
                }
            }
        }
        targets
    }
}

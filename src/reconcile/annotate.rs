//! AnnotationReconciler: places annotations and keeps them honest
//!
//! Nothing here trusts remembered state. Whether an identifier is annotated
//! is answered by looking at the tree: find annotation elements tagged with
//! the identifier and check that one of their nearby ancestors still reads
//! as that identifier. Annotations failing the check are removed on sight.

use super::anchor::ShapeKind;
use crate::resolve::StatusCache;
use crate::ticket::{Identifier, Status, TicketExtractor};
use crate::tree::{Document, Element, NodeId, TreeResult};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Class carried by every annotation element
pub const BADGE_CLASS: &str = "ticket-status-badge";
/// Attribute holding the exact identifier an annotation represents
pub const TICKET_ATTR: &str = "data-ticket-id";
/// Ancestor levels inspected by the validity test
pub const ANCESTOR_DEPTH: usize = 5;

/// Result of a placement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// A new annotation was inserted
    Placed(NodeId),
    /// A valid annotation already exists; nothing to do
    AlreadyAnnotated,
    /// The anchor left the tree or no longer reads as the identifier
    AnchorStale,
}

/// Orphans and surplus annotations removed by a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub orphans: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone)]
pub struct AnnotationReconciler {
    extractor: TicketExtractor,
    tracker_base_url: String,
}

impl AnnotationReconciler {
    pub fn new(extractor: TicketExtractor, tracker_base_url: impl Into<String>) -> Self {
        Self {
            extractor,
            tracker_base_url: tracker_base_url.into(),
        }
    }

    /// Detail page opened by clicking an annotation
    pub fn detail_url(&self, id: &Identifier) -> String {
        format!("{}/browse/{}", self.tracker_base_url.trim_end_matches('/'), id)
    }

    /// Every live annotation with the identifier it carries, document order
    pub fn annotations(&self, doc: &Document) -> Vec<(NodeId, Identifier)> {
        doc.elements()
            .into_iter()
            .filter_map(|node| {
                let element = doc.element(node)?;
                if !element.has_class(BADGE_CLASS) {
                    return None;
                }
                let id = Identifier::normalize(element.attribute(TICKET_ATTR)?)?;
                Some((node, id))
            })
            .collect()
    }

    fn annotations_for(&self, doc: &Document, id: &Identifier) -> Vec<NodeId> {
        self.annotations(doc)
            .into_iter()
            .filter(|(_, tagged)| tagged == id)
            .map(|(node, _)| node)
            .collect()
    }

    /// Whether an annotation at `badge` for `id` is still backed by its text
    pub fn is_valid(&self, doc: &Document, badge: NodeId, id: &Identifier) -> bool {
        doc.parent(badge)
            .is_some_and(|parent| self.reads_as(doc, parent, id))
    }

    /// Whether `node` or one of its first ancestors reads as `id`, counting
    /// `node` as the first of [`ANCESTOR_DEPTH`] levels
    fn reads_as(&self, doc: &Document, node: NodeId, id: &Identifier) -> bool {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .take(ANCESTOR_DEPTH)
            .any(|level| self.extractor.extract(&doc.text_content(level)).as_ref() == Some(id))
    }

    /// Whether a valid annotation for `id` exists anywhere in the live tree
    ///
    /// Invalid annotations for `id` are removed, as are valid ones beyond the
    /// first in document order.
    pub fn has_valid_annotation(&self, doc: &mut Document, id: &Identifier) -> bool {
        self.prune(doc, id, &mut SweepReport::default())
    }

    fn prune(&self, doc: &mut Document, id: &Identifier, report: &mut SweepReport) -> bool {
        let mut kept = false;
        for badge in self.annotations_for(doc, id) {
            if !self.is_valid(doc, badge, id) {
                warn!(ticket = %id, node = %badge, "removing orphaned annotation");
                if doc.remove(badge).is_ok() {
                    report.orphans += 1;
                }
            } else if kept {
                debug!(ticket = %id, node = %badge, "removing duplicate annotation");
                if doc.remove(badge).is_ok() {
                    report.duplicates += 1;
                }
            } else {
                kept = true;
            }
        }
        kept
    }

    /// Validate every annotation in the tree
    pub fn sweep(&self, doc: &mut Document) -> SweepReport {
        let mut report = SweepReport::default();
        let ids: BTreeSet<Identifier> = self
            .annotations(doc)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        for id in &ids {
            self.prune(doc, id, &mut report);
        }
        report
    }

    /// Where an annotation for `id` anchored at `anchor` goes
    ///
    /// Falls back to the anchor itself whenever the shape rule would put the
    /// annotation somewhere it fails validation.
    pub fn insertion_point(
        &self,
        doc: &Document,
        anchor: NodeId,
        kind: ShapeKind,
        id: &Identifier,
    ) -> NodeId {
        let point = match kind {
            // Trail the link rather than sit inside it
            ShapeKind::Leaf => doc.parent(anchor).unwrap_or(anchor),
            ShapeKind::Row => {
                let cells: Vec<NodeId> = doc
                    .descendants(anchor)
                    .into_iter()
                    .filter(|n| matches!(doc.tag(*n), Some("td" | "th")))
                    .collect();
                cells
                    .iter()
                    .copied()
                    .find(|cell| self.extractor.extract(&doc.text_content(*cell)).as_ref() == Some(id))
                    .or_else(|| cells.last().copied())
                    .unwrap_or(anchor)
            }
            ShapeKind::Cell => anchor,
            ShapeKind::Container => doc
                .descendants(anchor)
                .into_iter()
                .find(|n| {
                    matches!(doc.tag(*n), Some("a" | "span"))
                        && !doc.element(*n).is_some_and(|el| el.has_class(BADGE_CLASS))
                        && self.extractor.extract(&doc.text_content(*n)).as_ref() == Some(id)
                })
                .and_then(|n| doc.parent(n))
                .unwrap_or(anchor),
        };

        if self.reads_as(doc, point, id) {
            point
        } else {
            anchor
        }
    }

    /// Insert an annotation for `id` at `anchor`, unless one already exists
    ///
    /// Idempotent: repeated calls leave exactly one valid annotation.
    pub fn place(
        &self,
        doc: &mut Document,
        anchor: NodeId,
        kind: ShapeKind,
        id: &Identifier,
        status: &Status,
    ) -> TreeResult<PlacementOutcome> {
        if !doc.is_connected(anchor)
            || self.extractor.extract(&doc.text_content(anchor)).as_ref() != Some(id)
        {
            debug!(ticket = %id, node = %anchor, "anchor no longer carries the identifier");
            return Ok(PlacementOutcome::AnchorStale);
        }
        if self.has_valid_annotation(doc, id) {
            return Ok(PlacementOutcome::AlreadyAnnotated);
        }
        let point = self.insertion_point(doc, anchor, kind, id);

        let badge = doc.create(self.badge(id, status));
        doc.append_text(badge, status.name.clone())?;
        doc.append_child(point, badge)?;
        debug!(ticket = %id, status = %status.name, at = %point, "annotation placed");
        Ok(PlacementOutcome::Placed(badge))
    }

    /// Cache-only placement at a known anchor
    pub fn reattach(
        &self,
        doc: &mut Document,
        anchor: NodeId,
        id: &Identifier,
        cached: &Status,
    ) -> TreeResult<PlacementOutcome> {
        let kind = doc
            .element(anchor)
            .map(ShapeKind::of)
            .unwrap_or(ShapeKind::Container);
        self.place(doc, anchor, kind, id, cached)
    }

    /// Re-attach annotations for every target with a fresh cache entry
    ///
    /// Never resolves anything; returns how many annotations were placed.
    pub fn reattach_from_cache(
        &self,
        doc: &mut Document,
        targets: &[(NodeId, Identifier)],
        cache: &StatusCache,
    ) -> usize {
        let mut placed = 0;
        for (anchor, id) in targets {
            if self.has_valid_annotation(doc, id) {
                continue;
            }
            let Some(status) = cache.get(id) else {
                continue;
            };
            match self.reattach(doc, *anchor, id, &status) {
                Ok(PlacementOutcome::Placed(_)) => placed += 1,
                Ok(_) => {}
                Err(e) => warn!(ticket = %id, error = %e, "re-attach failed"),
            }
        }
        placed
    }

    fn badge(&self, id: &Identifier, status: &Status) -> Element {
        let mut element = Element::new("span")
            .with_class(BADGE_CLASS)
            .with_attribute(TICKET_ATTR, id.as_str())
            .with_attribute("title", format!("{}: {}", id, status.name))
            .with_attribute("href", self.detail_url(id))
            .with_attribute("target", "_blank")
            .with_attribute("data-category", status.category.as_str())
            .with_attribute("style", format!("background-color: {}", status.color.hex()));
        if let Some(error) = &status.error {
            element = element.with_attribute("data-error", error.as_str());
        }
        element
    }
}

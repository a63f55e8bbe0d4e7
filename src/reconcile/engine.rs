//! ReconciliationEngine: owns every piece of state a page view needs
//!
//! Created when the page activates and dropped when it goes away. The
//! status cache is shared through an `Arc` so it can outlive one engine
//! across navigations.

use super::anchor::{AnchorSelector, Candidate};
use super::annotate::{AnnotationReconciler, PlacementOutcome};
use crate::config::{ConfigResult, EngineConfig};
use crate::resolve::{ResolutionCoordinator, StatusCache, StatusResolver};
use crate::ticket::{Identifier, TicketExtractor};
use crate::tree::Document;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// The live tree, shared with whoever mutates it
pub type SharedDocument = Arc<Mutex<Document>>;

/// What one full pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub orphans_removed: usize,
    pub duplicates_removed: usize,
    pub candidates: usize,
    pub placed: usize,
    pub already_annotated: usize,
    pub stale: usize,
    pub failed_resolutions: usize,
    pub errors: usize,
}

/// Identifier occurrences and annotations currently in the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    /// Every occurrence in the body text, with its count
    pub occurrences: BTreeMap<Identifier, usize>,
    /// Annotations present, and whether each passes the validity test
    pub annotations: Vec<(Identifier, bool)>,
}

pub struct ReconciliationEngine {
    document: SharedDocument,
    extractor: TicketExtractor,
    selector: AnchorSelector,
    reconciler: AnnotationReconciler,
    coordinator: ResolutionCoordinator,
    build_page: AtomicBool,
}

impl ReconciliationEngine {
    pub fn new(
        config: &EngineConfig,
        document: SharedDocument,
        resolver: Arc<dyn StatusResolver>,
        cache: Arc<StatusCache>,
    ) -> ConfigResult<Self> {
        let extractor = config.extractor()?;
        config.base_url()?;
        Ok(Self {
            document,
            selector: AnchorSelector::new(extractor.clone()),
            reconciler: AnnotationReconciler::new(extractor.clone(), config.tracker_base_url.clone()),
            extractor,
            coordinator: ResolutionCoordinator::new(resolver, cache),
            build_page: AtomicBool::new(false),
        })
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        self.coordinator.cache()
    }

    pub fn coordinator(&self) -> &ResolutionCoordinator {
        &self.coordinator
    }

    pub fn reconciler(&self) -> &AnnotationReconciler {
        &self.reconciler
    }

    /// Whether the whole page counts as a build listing
    pub fn set_build_page(&self, build_page: bool) {
        self.build_page.store(build_page, Ordering::Relaxed);
    }

    pub fn is_build_page(&self) -> bool {
        self.build_page.load(Ordering::Relaxed)
    }

    pub fn lock(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sweep orphans and pick this pass's candidates
    pub fn select_anchors(&self, report: &mut PassReport) -> Vec<Candidate> {
        let mut doc = self.lock();
        let swept = self.reconciler.sweep(&mut doc);
        report.orphans_removed += swept.orphans;
        report.duplicates_removed += swept.duplicates;
        self.selector
            .select(&mut doc, &self.reconciler, self.is_build_page())
    }

    /// Select anchors, resolve their statuses and place annotations
    ///
    /// Candidates are handled best first, one at a time; a failure on one
    /// never stops the rest. The document is not locked while waiting on
    /// the resolver, so every placement re-checks the tree.
    pub async fn full_pass(&self) -> PassReport {
        let mut report = PassReport::default();
        let candidates = self.select_anchors(&mut report);
        report.candidates = candidates.len();

        let pass = self.coordinator.begin_pass();
        for candidate in &candidates {
            let annotated = {
                let mut doc = self.lock();
                self.reconciler
                    .has_valid_annotation(&mut doc, &candidate.identifier)
            };
            if annotated {
                report.already_annotated += 1;
                continue;
            }

            let status = pass.resolve(&candidate.identifier).await;
            if status.is_error() {
                report.failed_resolutions += 1;
            }

            let outcome = {
                let mut doc = self.lock();
                self.reconciler.place(
                    &mut doc,
                    candidate.node,
                    candidate.kind,
                    &candidate.identifier,
                    &status,
                )
            };
            match outcome {
                Ok(PlacementOutcome::Placed(_)) => report.placed += 1,
                Ok(PlacementOutcome::AlreadyAnnotated) => report.already_annotated += 1,
                Ok(PlacementOutcome::AnchorStale) => report.stale += 1,
                Err(e) => {
                    warn!(ticket = %candidate.identifier, error = %e, "placement failed");
                    report.errors += 1;
                }
            }
        }
        drop(pass);

        if report.candidates > 0 || report.orphans_removed > 0 {
            info!(
                candidates = report.candidates,
                placed = report.placed,
                orphans = report.orphans_removed,
                failed = report.failed_resolutions,
                "reconciliation pass finished"
            );
        }
        report
    }

    /// Re-attach annotations from cache only; returns how many were placed
    pub fn reattach_pass(&self) -> usize {
        let mut doc = self.lock();
        let targets = self.selector.reattach_targets(&doc);
        let placed = self
            .reconciler
            .reattach_from_cache(&mut doc, &targets, self.cache());
        if placed > 0 {
            debug!(placed, "re-attached annotations from cache");
        }
        placed
    }

    pub fn diagnose(&self) -> Diagnosis {
        let doc = self.lock();
        let mut occurrences = BTreeMap::new();
        for id in self.extractor.find_all(&doc.text_content(doc.body())) {
            *occurrences.entry(id).or_insert(0) += 1;
        }
        let annotations = self
            .reconciler
            .annotations(&doc)
            .into_iter()
            .map(|(badge, id)| {
                let valid = self.reconciler.is_valid(&doc, badge, &id);
                (id, valid)
            })
            .collect();
        Diagnosis {
            occurrences,
            annotations,
        }
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("coordinator", &self.coordinator)
            .field("build_page", &self.is_build_page())
            .finish()
    }
}

//! Reconciliation: anchor selection, annotation placement and the engine
//! that runs passes over a live document

mod anchor;
mod annotate;
mod engine;


pub use anchor::{
    pick_best, rank, AnchorSelector, Candidate, Criteria, NodeShape, Observation, Priority,
    ShapeKind, BOUNDED_CHILDREN_MAX, CONTAINER_TEXT_MAX, CONTEXT_LEAF_TEXT_MAX, EXCLUDED_TAGS,
    LEAF_TEXT_MAX, LEAF_TEXT_MIN, RELAXED_CHILDREN_MAX, RELAXED_TEXT_MAX,
};
pub use annotate::{
    AnnotationReconciler, PlacementOutcome, SweepReport, ANCESTOR_DEPTH, BADGE_CLASS, TICKET_ATTR,
};
pub use engine::{Diagnosis, PassReport, ReconciliationEngine, SharedDocument};

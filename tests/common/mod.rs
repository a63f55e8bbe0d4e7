//! Common test utilities for engine scenarios
//!
//! Builds build-listing documents, simulates a virtualized list that
//! recycles its row nodes, and provides a counting resolver.

#![allow(dead_code)]

pub mod mock_resolver;
pub mod virtual_list;

pub use mock_resolver::MockResolver;
pub use virtual_list::{build_line, VirtualList};

use std::sync::{Arc, Mutex};
use ticketmark::{
    Document, EngineConfig, Identifier, ReconciliationEngine, SharedDocument, StatusCache,
    StatusResolver,
};

pub const BUILDS_URL: &str = "https://commify.visualstudio.com/Project/_build?definitionId=42";

pub fn id(raw: &str) -> Identifier {
    Identifier::normalize(raw).unwrap()
}

pub fn shared(doc: Document) -> SharedDocument {
    Arc::new(Mutex::new(doc))
}

pub fn engine(document: SharedDocument, resolver: Arc<dyn StatusResolver>) -> ReconciliationEngine {
    ReconciliationEngine::new(
        &EngineConfig::default(),
        document,
        resolver,
        Arc::new(StatusCache::default()),
    )
    .unwrap()
}

/// Identifiers of every annotation with its validity, document order
pub fn annotations(engine: &ReconciliationEngine) -> Vec<(String, bool)> {
    let doc = engine.lock();
    engine
        .reconciler()
        .annotations(&doc)
        .into_iter()
        .map(|(badge, id)| {
            let valid = engine.reconciler().is_valid(&doc, badge, &id);
            (id.to_string(), valid)
        })
        .collect()
}

/// Assert every id in `visible` carries exactly one valid annotation and
/// nothing else is annotated
pub fn assert_annotated_exactly(engine: &ReconciliationEngine, visible: &[Identifier]) {
    let mut found = annotations(engine);
    assert!(
        found.iter().all(|(_, valid)| *valid),
        "invalid annotation survived: {found:?}"
    );
    found.sort();
    let mut expected: Vec<(String, bool)> = visible.iter().map(|id| (id.to_string(), true)).collect();
    expected.sort();
    assert_eq!(found, expected);
}

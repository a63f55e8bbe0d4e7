//! ticketmark: status annotations for ticket identifiers in a live tree
//!
//! Scans a document whose nodes are continuously created, destroyed and
//! recycled (virtual scrolling), finds ticket identifiers in node text,
//! resolves each identifier's workflow status through an external resolver
//! and places exactly one annotation per identifier next to the node that
//! best represents it.
//!
//! # Core Concepts
//!
//! - **Identifier**: normalized ticket token such as `ECP-4849`
//! - **Anchor**: the node chosen to host an identifier's annotation in a pass
//! - **Annotation**: the inserted badge; valid only while a nearby ancestor
//!   still reads as its identifier
//! - **Priming/Steady**: watcher states before and after the first full pass
//!   on a logical page
//!
//! # Example
//!
//! ```
//! use ticketmark::{Document, EngineConfig, NodeSpec, ReconciliationEngine, StaticResolver, StatusCache};
//! use std::sync::{Arc, Mutex};
//!
//! let doc = Document::from_specs(&[NodeSpec::element("div")
//!     .child(NodeSpec::element("a").with_text("#20260116.2 • feat: ECP-4849 add flag"))])
//! .unwrap();
//! let engine = ReconciliationEngine::new(
//!     &EngineConfig::default(),
//!     Arc::new(Mutex::new(doc)),
//!     Arc::new(StaticResolver::new()),
//!     Arc::new(StatusCache::default()),
//! )
//! .unwrap();
//! // Engine is ready for passes
//! ```

pub mod config;
pub mod reconcile;
pub mod resolve;
pub mod ticket;
pub mod tree;
pub mod watch;

pub use config::{ActivationConfig, ConfigError, ConfigResult, EngineConfig, TimingConfig};
pub use reconcile::{
    AnnotationReconciler, Diagnosis, PassReport, PlacementOutcome, ReconciliationEngine,
    SharedDocument,
};
pub use resolve::{
    ChannelResolver, FetchService, ResolutionCoordinator, ResolveError, ResolveResult,
    ResolvedStatus, StaticResolver, StatusCache, StatusResolver,
};
pub use ticket::{Identifier, Status, StatusCategory, StatusColor, TicketExtractor};
pub use tree::{Document, Element, NodeId, NodeKind, NodeSpec, TreeError, TreeResult};
pub use watch::{
    Location, MutationRecord, MutationWatcher, PageActivation, SharedLocation, WatchState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Status resolution: cache, per-identifier request deduplication and the
//! contract with the external resolver

mod cache;
mod coordinator;
mod messaging;
mod traits;

pub use cache::{CacheEntry, StatusCache, DEFAULT_FRESHNESS_SECS};
pub use coordinator::{PassScope, ResolutionCoordinator};
pub use messaging::{
    channel, ChannelResolver, Envelope, FetchRequest, FetchResponse, FetchService, FETCH_STATUS_ACTION,
};
pub use traits::{ResolveError, ResolveResult, ResolvedStatus, StaticResolver, StatusResolver};

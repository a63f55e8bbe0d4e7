//! ResolutionCoordinator: at most one outstanding resolution per identifier
//!
//! Each reconciliation pass owns its own result cells, so a failed lookup is
//! shared by every caller in that pass and forgotten when the pass ends.
//! Passes running at the same time join a call that is still outstanding;
//! the call is unregistered as soon as it settles, so nothing it produced
//! outlives the pass that asked for it. Successful lookups go to the
//! [`StatusCache`], which every call consults first.

use super::cache::StatusCache;
use super::traits::StatusResolver;
use crate::ticket::{Identifier, Status};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type Cell = Arc<OnceCell<Status>>;

fn lock_cells(cells: &Mutex<HashMap<Identifier, Cell>>) -> MutexGuard<'_, HashMap<Identifier, Cell>> {
    cells.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ResolutionCoordinator {
    resolver: Arc<dyn StatusResolver>,
    cache: Arc<StatusCache>,
    /// Calls that have not settled yet
    outstanding: Mutex<HashMap<Identifier, Cell>>,
    external_calls: AtomicUsize,
}

impl ResolutionCoordinator {
    pub fn new(resolver: Arc<dyn StatusResolver>, cache: Arc<StatusCache>) -> Self {
        Self {
            resolver,
            cache,
            outstanding: Mutex::new(HashMap::new()),
            external_calls: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    /// Number of calls made to the external resolver so far
    pub fn external_calls(&self) -> usize {
        self.external_calls.load(Ordering::Relaxed)
    }

    /// Number of resolver calls currently awaiting an answer
    pub fn outstanding(&self) -> usize {
        lock_cells(&self.outstanding).len()
    }

    /// Open a pass; its result cells are dropped with it
    pub fn begin_pass(&self) -> PassScope<'_> {
        PassScope {
            coordinator: self,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve outside of an explicit pass
    pub async fn resolve(&self, id: &Identifier) -> Status {
        self.begin_pass().resolve(id).await
    }

    /// Join the outstanding call for `id`, or start one
    async fn resolve_outstanding(&self, id: &Identifier) -> Status {
        let cell = {
            let mut outstanding = lock_cells(&self.outstanding);
            if let Some(status) = self.cache.get(id) {
                return status;
            }
            outstanding
                .entry(id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let status = cell.get_or_init(|| self.fetch(id)).await.clone();

        let mut outstanding = lock_cells(&self.outstanding);
        if outstanding.get(id).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            outstanding.remove(id);
        }
        status
    }

    async fn fetch(&self, id: &Identifier) -> Status {
        self.external_calls.fetch_add(1, Ordering::Relaxed);
        debug!(ticket = %id, "resolving status");

        match self.resolver.resolve_status(id).await {
            Ok(resolved) => {
                let status = resolved.into_status();
                self.cache.put(id.clone(), status.clone());
                status
            }
            Err(e) => {
                warn!(ticket = %id, error = %e, "status resolution failed");
                Status::error(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ResolutionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCoordinator")
            .field("cache_entries", &self.cache.len())
            .field("outstanding", &self.outstanding())
            .field("external_calls", &self.external_calls())
            .finish()
    }
}

/// An open reconciliation pass
///
/// Concurrent `resolve` calls for the same identifier within the pass share
/// a single external call and its result, failures included.
pub struct PassScope<'a> {
    coordinator: &'a ResolutionCoordinator,
    cells: Mutex<HashMap<Identifier, Cell>>,
}

impl PassScope<'_> {
    /// Status for `id`; never fails, errors come back as an error status
    pub async fn resolve(&self, id: &Identifier) -> Status {
        let cell = lock_cells(&self.cells)
            .entry(id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        cell.get_or_init(|| self.coordinator.resolve_outstanding(id))
            .await
            .clone()
    }
}

impl std::fmt::Debug for PassScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassScope")
            .field("identifiers", &lock_cells(&self.cells).len())
            .finish()
    }
}

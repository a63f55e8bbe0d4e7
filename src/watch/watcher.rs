//! MutationWatcher: decides when reconciliation passes run
//!
//! Two states. While **priming** no full pass has completed on the current
//! logical page: a mutation burst is debounced and then answered with one
//! full pass, after which the watcher is **steady**. In steady state a burst
//! is answered, after a shorter debounce, by a cache-only re-attach followed
//! by a full pass for new content. Scroll events re-attach only.
//!
//! A navigation to a new logical page discards the engine and its in-flight
//! bookkeeping and returns to priming. The status cache is kept.

use super::debounce::Debouncer;
use super::navigation::{Location, NavigationDetector, PageActivation, PageChange};
use crate::config::{ConfigResult, EngineConfig};
use crate::reconcile::{PassReport, ReconciliationEngine, SharedDocument};
use crate::resolve::{StatusCache, StatusResolver};
use crate::tree::NodeId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Priming,
    Steady,
}

/// One mutation notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub added_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn added(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            added_nodes: nodes.into_iter().collect(),
        }
    }
}

/// Counters since the watcher was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchStats {
    pub full_passes: usize,
    pub reattach_passes: usize,
    pub reattached: usize,
    pub navigations: usize,
}

#[derive(Debug, Default)]
struct Counters {
    full_passes: AtomicUsize,
    reattach_passes: AtomicUsize,
    reattached: AtomicUsize,
    navigations: AtomicUsize,
}

pub struct MutationWatcher {
    config: EngineConfig,
    document: SharedDocument,
    resolver: Arc<dyn StatusResolver>,
    cache: Arc<StatusCache>,
    location: Arc<dyn Location>,
    activation: PageActivation,
    engine: RwLock<Arc<ReconciliationEngine>>,
    state: Mutex<WatchState>,
    navigation: Mutex<NavigationDetector>,
    /// Bumped on every navigation reset; passes from an older page never
    /// flip the state
    generation: AtomicU64,
    mutations: Debouncer,
    scroll: Debouncer,
    initial: Debouncer,
    counters: Counters,
}

impl MutationWatcher {
    pub fn new(
        config: EngineConfig,
        document: SharedDocument,
        resolver: Arc<dyn StatusResolver>,
        cache: Arc<StatusCache>,
        location: Arc<dyn Location>,
    ) -> ConfigResult<Arc<Self>> {
        let engine = ReconciliationEngine::new(&config, document.clone(), resolver.clone(), cache.clone())?;
        let activation = PageActivation::new(config.activation.clone());
        Ok(Arc::new(Self {
            navigation: Mutex::new(NavigationDetector::new(activation.clone())),
            activation,
            engine: RwLock::new(Arc::new(engine)),
            state: Mutex::new(WatchState::Priming),
            generation: AtomicU64::new(0),
            mutations: Debouncer::new(),
            scroll: Debouncer::new(),
            initial: Debouncer::new(),
            counters: Counters::default(),
            config,
            document,
            resolver,
            cache,
            location,
        }))
    }

    /// Engine for the current logical page
    pub fn engine(&self) -> Arc<ReconciliationEngine> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    pub fn state(&self) -> WatchState {
        *self.lock_state()
    }

    pub fn stats(&self) -> WatchStats {
        WatchStats {
            full_passes: self.counters.full_passes.load(Ordering::Relaxed),
            reattach_passes: self.counters.reattach_passes.load(Ordering::Relaxed),
            reattached: self.counters.reattached.load(Ordering::Relaxed),
            navigations: self.counters.navigations.load(Ordering::Relaxed),
        }
    }

    /// Whether the current location passes the activation predicate
    pub fn is_active(&self) -> bool {
        self.activation.is_active_href(&self.location.href())
    }

    fn lock_state(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_navigation(&self) -> MutexGuard<'_, NavigationDetector> {
        self.navigation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the watcher on the current page
    ///
    /// Schedules the initial pass and spawns the navigation poll loop, which
    /// ends once the watcher is dropped.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let href = self.location.href();
        self.lock_navigation().observe(&href);
        self.engine()
            .set_build_page(self.activation.is_build_page_href(&href));

        if self.is_active() {
            self.schedule_initial_pass();
        } else {
            debug!(href = %href, "page inactive, waiting for navigation");
        }

        let watcher = Arc::downgrade(self);
        let period = self.config.timing.navigation_poll();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let Some(watcher) = watcher.upgrade() else {
                    break;
                };
                watcher.poll_navigation();
            }
        })
    }

    /// React to a batch of mutation notifications
    ///
    /// Batches without added nodes are ignored. A new burst supersedes the
    /// pending one.
    pub fn on_mutations(self: &Arc<Self>, records: &[MutationRecord]) {
        if records.iter().all(|r| r.added_nodes.is_empty()) || !self.is_active() {
            return;
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let watcher = self.clone();
        match self.state() {
            WatchState::Priming => {
                self.mutations
                    .schedule(self.config.timing.priming_debounce(), move || async move {
                        watcher.run_full_pass(generation).await;
                    });
            }
            WatchState::Steady => {
                self.mutations
                    .schedule(self.config.timing.steady_debounce(), move || async move {
                        watcher.run_reattach();
                        watcher.run_full_pass(generation).await;
                    });
            }
        }
    }

    /// Safety net: re-attach from cache after scrolling settles
    pub fn on_scroll(self: &Arc<Self>) {
        if self.state() != WatchState::Steady || !self.is_active() {
            return;
        }
        let watcher = self.clone();
        self.scroll
            .schedule(self.config.timing.scroll_debounce(), move || async move {
                watcher.run_reattach();
            });
    }

    /// Check the location once; returns whether a reset happened
    pub fn poll_navigation(self: &Arc<Self>) -> bool {
        let href = self.location.href();
        let change = self.lock_navigation().observe(&href);
        match change {
            Some(change) => {
                self.reset(change);
                true
            }
            None => false,
        }
    }

    fn reset(self: &Arc<Self>, change: PageChange) {
        info!(key = %change.key, href = %change.href, "new page, resetting to priming");
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.mutations.cancel();
        self.scroll.cancel();

        match ReconciliationEngine::new(
            &self.config,
            self.document.clone(),
            self.resolver.clone(),
            self.cache.clone(),
        ) {
            Ok(engine) => {
                engine.set_build_page(self.activation.is_build_page_href(&change.href));
                *self.engine.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(engine);
            }
            Err(e) => error!(error = %e, "could not rebuild engine, keeping the old one"),
        }

        *self.lock_state() = WatchState::Priming;
        self.counters.navigations.fetch_add(1, Ordering::Relaxed);
        self.schedule_initial_pass();
    }

    fn schedule_initial_pass(self: &Arc<Self>) {
        let generation = self.generation.load(Ordering::SeqCst);
        let watcher = self.clone();
        self.initial
            .schedule(self.config.timing.initial_delay(), move || async move {
                watcher.run_full_pass(generation).await;
            });
    }

    async fn run_full_pass(&self, generation: u64) -> PassReport {
        let report = self.engine().full_pass().await;
        self.counters.full_passes.fetch_add(1, Ordering::Relaxed);

        if self.generation.load(Ordering::SeqCst) == generation {
            let mut state = self.lock_state();
            if *state == WatchState::Priming {
                debug!("first pass complete, watcher steady");
                *state = WatchState::Steady;
            }
        }
        report
    }

    fn run_reattach(&self) -> usize {
        let placed = self.engine().reattach_pass();
        self.counters.reattach_passes.fetch_add(1, Ordering::Relaxed);
        self.counters.reattached.fetch_add(placed, Ordering::Relaxed);
        placed
    }
}

impl std::fmt::Debug for MutationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationWatcher")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

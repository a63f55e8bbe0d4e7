//! Cancellable delayed tasks
//!
//! A [`Debouncer`] holds at most one pending task. Scheduling a new one
//! aborts the previous task while it is still waiting out its delay, so a
//! superseded job never runs. A job that already started runs to completion.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

const WAITING: u8 = 0;
const RUNNING: u8 = 1;
const SUPERSEDED: u8 = 2;

#[derive(Debug)]
struct Pending {
    state: Arc<AtomicU8>,
    abort: AbortHandle,
}

impl Pending {
    fn supersede(self) {
        if self
            .state
            .compare_exchange(WAITING, SUPERSEDED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.abort.abort();
        }
    }
}

/// Trailing-edge debounce: only the last task scheduled within a delay runs
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `job` after `delay` unless another schedule or a cancel comes first
    pub fn schedule<F, Fut>(&self, delay: Duration, job: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(WAITING));
        let task_state = state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task_state
                .compare_exchange(WAITING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            job().await;
        });

        let previous = self.lock().replace(Pending {
            state,
            abort: handle.abort_handle(),
        });
        if let Some(previous) = previous {
            previous.supersede();
        }
        handle
    }

    /// Drop the pending task, if any
    pub fn cancel(&self) {
        if let Some(pending) = self.lock().take() {
            pending.supersede();
        }
    }

    /// Whether a task is still waiting out its delay
    pub fn is_pending(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|p| p.state.load(Ordering::Acquire) == WAITING)
    }
}

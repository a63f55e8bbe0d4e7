//! Mock status resolver
//!
//! Answers every identifier with a status derived from its number, counts
//! calls per identifier, and fails on request.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use ticketmark::{Identifier, ResolveError, ResolveResult, ResolvedStatus, StatusCategory, StatusResolver};

#[derive(Debug, Default)]
pub struct MockResolver {
    calls: Mutex<HashMap<Identifier, usize>>,
    failing: Mutex<HashSet<Identifier>>,
    latency: Option<Duration>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail(&self, id: Identifier) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn recover(&self, id: &Identifier) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn calls_for(&self, id: &Identifier) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    /// Status served for `id`: cycles through the three categories
    pub fn status_for(id: &Identifier) -> ResolvedStatus {
        match id.number().parse::<u64>().unwrap_or(0) % 3 {
            0 => ResolvedStatus::new("To Do", StatusCategory::New),
            1 => ResolvedStatus::new("In Progress", StatusCategory::Indeterminate),
            _ => ResolvedStatus::new("Done", StatusCategory::Done),
        }
    }
}

#[async_trait]
impl StatusResolver for MockResolver {
    async fn resolve_status(&self, id: &Identifier) -> ResolveResult<ResolvedStatus> {
        *self.calls.lock().unwrap().entry(id.clone()).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.lock().unwrap().contains(id) {
            return Err(ResolveError::Failed("HTTP error! status: 503".to_string()));
        }
        Ok(Self::status_for(id))
    }
}

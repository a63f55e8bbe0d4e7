//! Resolver trait: the contract with whatever knows ticket statuses
//!
//! The network call, authentication and response parsing all live behind
//! this trait. The engine only requires that a call eventually returns.

use crate::ticket::{Identifier, Status, StatusCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors a resolver or its transport can report
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("status not found for {0}")]
    NotFound(Identifier),

    #[error("resolver failed: {0}")]
    Failed(String),

    #[error("messaging channel closed")]
    ChannelClosed,

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Result type for resolver calls
pub type ResolveResult<T> = Result<T, ResolveError>;

/// What the external resolver reports for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStatus {
    pub name: String,
    pub category: StatusCategory,
    #[serde(default = "default_override_eligible")]
    pub color_override_eligible: bool,
}

fn default_override_eligible() -> bool {
    true
}

impl ResolvedStatus {
    pub fn new(name: impl Into<String>, category: StatusCategory) -> Self {
        Self {
            name: name.into(),
            category,
            color_override_eligible: true,
        }
    }

    pub fn into_status(self) -> Status {
        Status::with_override(self.name, self.category, self.color_override_eligible)
    }
}

/// Resolves a ticket's current status
#[async_trait]
pub trait StatusResolver: Send + Sync {
    async fn resolve_status(&self, id: &Identifier) -> ResolveResult<ResolvedStatus>;
}

/// Resolver backed by a fixed map; unknown identifiers are `NotFound`
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    statuses: HashMap<Identifier, ResolvedStatus>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, id: Identifier, status: ResolvedStatus) -> Self {
        self.statuses.insert(id, status);
        self
    }

    pub fn insert(&mut self, id: Identifier, status: ResolvedStatus) {
        self.statuses.insert(id, status);
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl FromIterator<(Identifier, ResolvedStatus)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (Identifier, ResolvedStatus)>>(iter: I) -> Self {
        Self {
            statuses: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl StatusResolver for StaticResolver {
    async fn resolve_status(&self, id: &Identifier) -> ResolveResult<ResolvedStatus> {
        self.statuses
            .get(id)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(id.clone()))
    }
}

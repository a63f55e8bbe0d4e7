//! Request/response bridge between the tree-observing side and the
//! fetching side
//!
//! The observing side holds a [`ChannelResolver`] and sends
//! `{"action": "fetchStatus", "ticketId": ...}` requests. The fetching side
//! runs a [`FetchService`] that answers each request on its own task, so a
//! slow lookup never holds up the others and replies may arrive late.

use super::cache::StatusCache;
use super::traits::{ResolveError, ResolveResult, ResolvedStatus, StatusResolver};
use crate::ticket::{Identifier, StatusCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Action name carried by status requests
pub const FETCH_STATUS_ACTION: &str = "fetchStatus";

/// A request sent to the fetching side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum FetchRequest {
    #[serde(rename = "fetchStatus", rename_all = "camelCase")]
    FetchStatus { ticket_id: Identifier },
}

/// The fetching side's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResolvedStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResponse {
    pub fn ok(status: ResolvedStatus) -> Self {
        Self {
            success: true,
            status: Some(status),
            error: None,
        }
    }

    /// Failed reply; still carries a displayable "Error" status
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: Some(ResolvedStatus::new("Error", StatusCategory::Unknown)),
            error: Some(error.into()),
        }
    }

    fn into_result(self) -> ResolveResult<ResolvedStatus> {
        match (self.success, self.status) {
            (true, Some(status)) => Ok(status),
            (true, None) => Err(ResolveError::Malformed(
                "successful reply without a status".to_string(),
            )),
            (false, _) => Err(ResolveError::Failed(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

/// A request in transit together with the slot for its reply
#[derive(Debug)]
pub struct Envelope {
    pub request: FetchRequest,
    pub reply: oneshot::Sender<FetchResponse>,
}

/// Create a connected resolver and request receiver
pub fn channel(capacity: usize) -> (ChannelResolver, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelResolver { tx }, rx)
}

/// Observing-side resolver that forwards each lookup over the channel
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    tx: mpsc::Sender<Envelope>,
}

#[async_trait]
impl StatusResolver for ChannelResolver {
    async fn resolve_status(&self, id: &Identifier) -> ResolveResult<ResolvedStatus> {
        let (reply, response) = oneshot::channel();
        let envelope = Envelope {
            request: FetchRequest::FetchStatus {
                ticket_id: id.clone(),
            },
            reply,
        };
        self.tx
            .send(envelope)
            .await
            .map_err(|_| ResolveError::ChannelClosed)?;
        response
            .await
            .map_err(|_| ResolveError::ChannelClosed)?
            .into_result()
    }
}

/// Fetching-side service answering status requests
///
/// Keeps its own cache with the same freshness window as the observing
/// side, so repeated requests after a page reload skip the tracker.
pub struct FetchService {
    resolver: Arc<dyn StatusResolver>,
    cache: StatusCache<ResolvedStatus>,
}

impl FetchService {
    pub fn new(resolver: Arc<dyn StatusResolver>, cache: StatusCache<ResolvedStatus>) -> Self {
        Self { resolver, cache }
    }

    /// Answer one request
    pub async fn handle(&self, request: FetchRequest) -> FetchResponse {
        let FetchRequest::FetchStatus { ticket_id } = request;
        if let Some(status) = self.cache.get(&ticket_id) {
            return FetchResponse::ok(status);
        }

        match self.resolver.resolve_status(&ticket_id).await {
            Ok(status) => {
                self.cache.put(ticket_id, status.clone());
                FetchResponse::ok(status)
            }
            Err(e) => {
                warn!(ticket = %ticket_id, error = %e, "fetch failed");
                FetchResponse::failed(e.to_string())
            }
        }
    }

    /// Serve requests until every sender is dropped
    pub async fn serve(self: Arc<Self>, mut requests: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { request, reply }) = requests.recv().await {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                let response = service.handle(request).await;
                if reply.send(response).is_err() {
                    debug!("requester went away before the reply");
                }
            });
        }
    }
}

impl std::fmt::Debug for FetchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchService")
            .field("cached", &self.cache.len())
            .finish()
    }
}

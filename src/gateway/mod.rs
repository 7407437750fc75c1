//! Remote notification service contract and its adapters.
//!
//! # Module Structure
//!
//! - `http` - REST adapter over reqwest
//! - `memory` - In-process server simulation (demo mode and tests)

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::{GatewayOp, InMemoryGateway};

use crate::model::{NotificationId, RecentNotifications};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a [`NotificationGateway`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request did not complete (DNS, connection, TLS, reset).
    #[error("Network error: {0}")]
    Network(String),
    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// Credentials missing, expired or rejected (HTTP 401/403).
    #[error("Not authorized")]
    Auth,
    /// The notification was already resolved or deleted (HTTP 404).
    #[error("Notification not found")]
    NotFound,
    /// Any other non-success status.
    #[error("Server error: status {0}")]
    Server(u16),
    /// The body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Parse(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    InsecureBaseUrl,
}

impl GatewayError {
    /// True for failures where the request may not have reached the server.
    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Timeout)
    }
}

/// The four operations the sync core consumes from the notification service.
///
/// Each call is independent and may fail; callers decide how failures
/// surface. Implementations must be cheap to share across tasks.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Lightweight poll: the server-wide unread count.
    async fn fetch_unread_count(&self) -> Result<u64, GatewayError>;

    /// The newest `limit` notifications plus the unread count.
    async fn fetch_recent(&self, limit: usize) -> Result<RecentNotifications, GatewayError>;

    async fn mark_read(&self, id: &NotificationId) -> Result<(), GatewayError>;

    async fn mark_all_read(&self) -> Result<(), GatewayError>;
}

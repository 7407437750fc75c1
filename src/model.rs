use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Identifiers and Categories
// ============================================================================

/// Opaque server-assigned notification identifier.
///
/// Stable across fetches; the only key used to match cached items against
/// server responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Notification category.
///
/// Unknown categories from a newer server decode as `System` instead of
/// failing the whole list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Application,
    Interview,
    Offer,
    Rejection,
    Message,
    #[serde(other)]
    System,
}

impl NotificationKind {
    /// Short glyph shown in front of each row in the dropdown.
    pub fn icon(self) -> &'static str {
        match self {
            NotificationKind::Application => "✉",
            NotificationKind::Interview => "☎",
            NotificationKind::Offer => "★",
            NotificationKind::Rejection => "✗",
            NotificationKind::System => "ℹ",
            NotificationKind::Message => "✎",
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A server-owned notification mirrored in the local cache.
///
/// Text fields use `Arc<str>` so cloning the cached list for rendering or
/// for copy-on-write updates does not copy message bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: Arc<str>,
    pub message: Arc<str>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub action_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response of the list operation: the newest notifications plus the
/// server-wide unread count at the time of the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentNotifications {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

/// Response of the lightweight count poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

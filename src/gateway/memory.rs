use super::{GatewayError, NotificationGateway};
use crate::model::{Notification, NotificationId, RecentNotifications};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Gateway operation selector for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    UnreadCount,
    ListRecent,
    MarkRead,
    MarkAllRead,
}

#[derive(Default)]
struct ServerState {
    /// Newest first.
    notifications: Vec<Notification>,
    calls: HashMap<GatewayOp, usize>,
    fail_next: HashMap<GatewayOp, VecDeque<GatewayError>>,
    fail_always: HashMap<GatewayOp, GatewayError>,
    delay_next: HashMap<GatewayOp, VecDeque<Duration>>,
}

/// In-process notification server.
///
/// Backs the `--demo` mode of the binary and the sync core tests. Every call
/// is counted; failures and latency can be injected per operation.
///
/// List responses are snapshotted when the call starts and delivered after
/// any injected delay, so a slow list call returns the state the server had
/// when the request arrived. Mutations apply after their delay.
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<ServerState>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway pre-populated with `notifications` (any order).
    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        let gateway = Self::new();
        for n in notifications {
            gateway.push(n);
        }
        gateway
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        // A panicking test thread must not wedge every later call
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a notification, keeping the newest-first order.
    pub fn push(&self, notification: Notification) {
        let mut state = self.lock();
        let pos = state
            .notifications
            .iter()
            .position(|n| n.created_at < notification.created_at)
            .unwrap_or(state.notifications.len());
        state.notifications.insert(pos, notification);
    }

    /// Server-side read flag for `id`, if it exists.
    pub fn is_read(&self, id: &NotificationId) -> Option<bool> {
        self.lock()
            .notifications
            .iter()
            .find(|n| &n.id == id)
            .map(|n| n.is_read)
    }

    /// Flip a notification back to unread (e.g. marked unread elsewhere).
    pub fn set_unread(&self, id: &NotificationId) {
        if let Some(n) = self.lock().notifications.iter_mut().find(|n| &n.id == id) {
            n.is_read = false;
        }
    }

    pub fn unread_count(&self) -> u64 {
        self.lock()
            .notifications
            .iter()
            .filter(|n| !n.is_read)
            .count() as u64
    }

    /// Number of calls received for `op` so far.
    pub fn calls(&self, op: GatewayOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Fail the next call of `op` with `error`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.lock().fail_next.entry(op).or_default().push_back(error);
    }

    /// Fail every call of `op` with `error` until cleared with `None`.
    pub fn fail_always(&self, op: GatewayOp, error: Option<GatewayError>) {
        let mut state = self.lock();
        match error {
            Some(e) => {
                state.fail_always.insert(op, e);
            }
            None => {
                state.fail_always.remove(&op);
            }
        }
    }

    /// Delay the response of the next call of `op`.
    pub fn delay_next(&self, op: GatewayOp, delay: Duration) {
        self.lock().delay_next.entry(op).or_default().push_back(delay);
    }

    /// Count the call and take its injected delay and failure, if any.
    fn begin(&self, op: GatewayOp) -> (Option<Duration>, Option<GatewayError>) {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        let delay = state.delay_next.get_mut(&op).and_then(VecDeque::pop_front);
        let failure = state
            .fail_next
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .or_else(|| state.fail_always.get(&op).cloned());
        (delay, failure)
    }
}

async fn wait(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl NotificationGateway for InMemoryGateway {
    async fn fetch_unread_count(&self) -> Result<u64, GatewayError> {
        let (delay, failure) = self.begin(GatewayOp::UnreadCount);
        let count = self.unread_count();
        wait(delay).await;
        match failure {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    async fn fetch_recent(&self, limit: usize) -> Result<RecentNotifications, GatewayError> {
        let (delay, failure) = self.begin(GatewayOp::ListRecent);
        let snapshot = {
            let state = self.lock();
            RecentNotifications {
                notifications: state.notifications.iter().take(limit).cloned().collect(),
                unread_count: state.notifications.iter().filter(|n| !n.is_read).count() as u64,
            }
        };
        wait(delay).await;
        match failure {
            Some(e) => Err(e),
            None => Ok(snapshot),
        }
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), GatewayError> {
        let (delay, failure) = self.begin(GatewayOp::MarkRead);
        wait(delay).await;
        if let Some(e) = failure {
            return Err(e);
        }
        let mut state = self.lock();
        match state.notifications.iter_mut().find(|n| &n.id == id) {
            Some(n) => {
                n.is_read = true;
                Ok(())
            }
            None => Err(GatewayError::NotFound),
        }
    }

    async fn mark_all_read(&self) -> Result<(), GatewayError> {
        let (delay, failure) = self.begin(GatewayOp::MarkAllRead);
        wait(delay).await;
        if let Some(e) = failure {
            return Err(e);
        }
        for n in self.lock().notifications.iter_mut() {
            n.is_read = true;
        }
        Ok(())
    }
}

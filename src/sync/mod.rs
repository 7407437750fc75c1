//! Notification sync core.
//!
//! Keeps a local mirror of the server's unread count and recent
//! notifications, applies mark-read actions optimistically, and polls the
//! count while the widget is mounted.
//!
//! # Module Structure
//!
//! - `center` - `NotificationCenter`, the single owner of all state
//! - `events` - Completion events from background tasks and their handling
//! - `cache` - Local cache snapshot
//! - `reconcile` - Optimistic mutation bookkeeping
//! - `scheduler` - Count poll interval and list-request generations
//! - `dropdown` - Open/closed state machine and dismissal listeners

mod cache;
mod center;
mod dropdown;
mod events;
mod reconcile;
mod scheduler;
mod task;

pub use cache::NotificationCache;
pub use center::{badge_label, NotificationCenter, NotificationView};
pub use dropdown::{Dropdown, ListenerGuard, ListenerRegistry, PointerTarget, UiEvent};
pub use events::SyncEvent;
pub use reconcile::Reconciler;
pub use scheduler::Scheduler;

use std::time::Duration;

/// What to do with an optimistic update when the server rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Leave the optimistic state in place; the next list refresh corrects
    /// it if the server disagrees.
    #[default]
    Keep,
    /// Flip the items back to unread and restore the count.
    Revert,
}

/// Tunables for the sync core.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub fetch_limit: usize,
    pub rollback: RollbackPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            fetch_limit: 10,
            rollback: RollbackPolicy::Keep,
        }
    }
}

/// Host routing hook used when a notification with an `actionUrl` is
/// activated.
pub trait Navigator: Send {
    fn navigate(&mut self, target: &str);
}

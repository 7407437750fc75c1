//! In-memory mirror of the server's notification list and unread count.

use crate::model::{Notification, NotificationId};
use std::sync::Arc;

/// Local cache snapshot.
///
/// `notifications` keeps the server's order (newest first) and is never
/// re-sorted locally. `unread_count` is the server-wide count and may exceed
/// the number of unread items in the (bounded) list.
///
/// The list is wrapped in `Arc` so the view model can hand it out without
/// copying; mutations go through `Arc::make_mut` on the owner task.
#[derive(Debug, Clone, Default)]
pub struct NotificationCache {
    notifications: Arc<Vec<Notification>>,
    unread_count: u64,
}

impl NotificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &Arc<Vec<Notification>> {
        &self.notifications
    }

    pub fn unread_count(&self) -> u64 {
        self.unread_count
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.notifications.iter().find(|n| &n.id == id)
    }

    /// Number of unread items in the cached list.
    pub fn unread_in_list(&self) -> u64 {
        self.notifications.iter().filter(|n| !n.is_read).count() as u64
    }

    /// Replace list and count with an authoritative server response.
    pub fn replace(&mut self, notifications: Vec<Notification>, unread_count: u64) {
        self.notifications = Arc::new(notifications);
        self.unread_count = unread_count;
    }

    /// Returns true if the stored count changed.
    pub fn set_unread_count(&mut self, count: u64) -> bool {
        let changed = self.unread_count != count;
        self.unread_count = count;
        changed
    }

    /// Flip `id` to read and decrement the count (floor 0).
    ///
    /// Returns false, leaving everything untouched, when `id` is not cached
    /// or already read.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        let is_unread = self.get(id).is_some_and(|n| !n.is_read);
        if !is_unread {
            return false;
        }
        let notifications = Arc::make_mut(&mut self.notifications);
        if let Some(n) = notifications.iter_mut().find(|n| &n.id == id) {
            n.is_read = true;
        }
        self.unread_count = self.unread_count.saturating_sub(1);
        true
    }

    /// Flip every cached item to read and zero the count.
    ///
    /// Returns the ids that were unread before the call.
    pub fn mark_all_read(&mut self) -> Vec<NotificationId> {
        let previously_unread: Vec<NotificationId> = self
            .notifications
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id.clone())
            .collect();
        if !previously_unread.is_empty() {
            for n in Arc::make_mut(&mut self.notifications).iter_mut() {
                n.is_read = true;
            }
        }
        self.unread_count = 0;
        previously_unread
    }

    /// Undo a local mark-read: flip `id` back to unread and re-increment.
    ///
    /// No-op (returns false) if the item is gone or already unread.
    pub fn mark_unread(&mut self, id: &NotificationId) -> bool {
        let is_read = self.get(id).is_some_and(|n| n.is_read);
        if !is_read {
            return false;
        }
        let notifications = Arc::make_mut(&mut self.notifications);
        if let Some(n) = notifications.iter_mut().find(|n| &n.id == id) {
            n.is_read = false;
        }
        self.unread_count = self.unread_count.saturating_add(1);
        true
    }
}

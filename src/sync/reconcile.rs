//! Optimistic mutation bookkeeping.
//!
//! Every local mutation bumps a logical *epoch*. Requests that read server
//! state (list refresh, count poll) record the epoch at issue time, so when
//! their response arrives we can tell whether it predates a local write.

use super::cache::NotificationCache;
use super::RollbackPolicy;
use crate::gateway::GatewayError;
use crate::model::{NotificationId, RecentNotifications};
use std::collections::HashMap;

/// A mark-all request that has not been confirmed yet.
#[derive(Debug)]
struct PendingMarkAll {
    epoch: u64,
    previously_unread: Vec<NotificationId>,
    previous_count: u64,
}

#[derive(Debug)]
pub struct Reconciler {
    policy: RollbackPolicy,
    epoch: u64,
    /// Single marks awaiting the server's answer: id -> epoch of the mark.
    pending: HashMap<NotificationId, u64>,
    /// Latest local mark per id not yet superseded by a newer list response.
    local_marks: HashMap<NotificationId, u64>,
    mark_all: Option<PendingMarkAll>,
    /// Epoch of the latest mark-all not yet superseded by a list response.
    last_mark_all: Option<u64>,
}

impl Reconciler {
    pub fn new(policy: RollbackPolicy) -> Self {
        Self {
            policy,
            epoch: 0,
            pending: HashMap::new(),
            local_marks: HashMap::new(),
            mark_all: None,
            last_mark_all: None,
        }
    }

    /// Current mutation epoch; stamped onto outgoing read requests.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn pending_marks(&self) -> usize {
        self.pending.len()
    }

    pub fn mark_all_pending(&self) -> bool {
        self.mark_all.is_some()
    }

    /// Optimistically mark `id` read. Returns the mutation epoch to send
    /// along with the request, or `None` if nothing changed.
    pub fn begin_mark(&mut self, cache: &mut NotificationCache, id: &NotificationId) -> Option<u64> {
        if !cache.mark_read(id) {
            return None;
        }
        self.epoch += 1;
        self.pending.insert(id.clone(), self.epoch);
        self.local_marks.insert(id.clone(), self.epoch);
        Some(self.epoch)
    }

    pub fn confirm_mark(&mut self, id: &NotificationId, epoch: u64) {
        if self.pending.get(id) == Some(&epoch) {
            self.pending.remove(id);
        }
    }

    /// Settle a failed mark-read. Returns true if the cache changed.
    pub fn fail_mark(
        &mut self,
        cache: &mut NotificationCache,
        id: &NotificationId,
        epoch: u64,
        error: &GatewayError,
    ) -> bool {
        if self.pending.get(id) == Some(&epoch) {
            self.pending.remove(id);
        }
        if *error == GatewayError::NotFound {
            // Already read or deleted on the server: the local state is right
            return false;
        }
        if self.policy == RollbackPolicy::Keep {
            return false;
        }
        // Only revert the mark this response belongs to, and only if no
        // newer list response has taken over the item
        if self.local_marks.get(id) != Some(&epoch) {
            return false;
        }
        self.local_marks.remove(id);
        cache.mark_unread(id)
    }

    /// Optimistically mark everything read. Returns the mutation epoch.
    pub fn begin_mark_all(&mut self, cache: &mut NotificationCache) -> u64 {
        let previous_count = cache.unread_count();
        let previously_unread = cache.mark_all_read();
        self.epoch += 1;
        self.mark_all = Some(PendingMarkAll {
            epoch: self.epoch,
            previously_unread,
            previous_count,
        });
        self.last_mark_all = Some(self.epoch);
        self.epoch
    }

    pub fn confirm_mark_all(&mut self, epoch: u64) {
        if self.mark_all.as_ref().is_some_and(|p| p.epoch == epoch) {
            self.mark_all = None;
        }
    }

    /// Settle a failed mark-all. Returns true if the cache changed.
    pub fn fail_mark_all(&mut self, cache: &mut NotificationCache, epoch: u64) -> bool {
        let pending = match self.mark_all.take() {
            Some(p) if p.epoch == epoch => p,
            other => {
                self.mark_all = other;
                return false;
            }
        };
        if self.policy == RollbackPolicy::Keep {
            return false;
        }
        if self.last_mark_all == Some(epoch) {
            self.last_mark_all = None;
        }
        let mut changed = false;
        for id in &pending.previously_unread {
            // Items marked individually since then keep their own fate
            if self.local_marks.get(id).is_some_and(|&e| e > epoch) {
                continue;
            }
            changed |= cache.mark_unread(id);
        }
        let restored = cache.unread_count().max(pending.previous_count);
        changed |= cache.set_unread_count(restored);
        changed
    }

    /// Whether a locally-read item must stay read despite a list response
    /// issued at `issued_epoch` reporting it unread.
    fn keeps_local_read(&self, id: &NotificationId, issued_epoch: u64) -> bool {
        let covered_by_mark_all = self
            .mark_all
            .as_ref()
            .is_some_and(|p| p.previously_unread.contains(id));
        if self.pending.contains_key(id) || covered_by_mark_all {
            return true;
        }
        let marked_after = |e: &u64| *e > issued_epoch;
        self.local_marks.get(id).is_some_and(marked_after)
            || self.last_mark_all.as_ref().is_some_and(marked_after)
    }

    /// Apply an authoritative list response.
    ///
    /// Server values win, except for items the user marked read after the
    /// request was issued or whose mark is still unconfirmed. Those stay read
    /// and the server count is lowered by the number of such items.
    pub fn apply_list(
        &mut self,
        cache: &mut NotificationCache,
        response: RecentNotifications,
        issued_epoch: u64,
        limit: usize,
    ) {
        let RecentNotifications {
            mut notifications,
            unread_count,
        } = response;
        notifications.truncate(limit);

        let mut preserved = 0u64;
        for n in notifications.iter_mut() {
            if !n.is_read && self.keeps_local_read(&n.id, issued_epoch) {
                n.is_read = true;
                preserved += 1;
            }
        }
        if preserved > 0 {
            tracing::debug!(preserved, issued_epoch, "Kept local read state over older server snapshot");
        }

        // Marks the response has caught up with are no longer ours to revert
        let pending = &self.pending;
        self.local_marks
            .retain(|id, e| *e > issued_epoch || pending.contains_key(id));
        if self.mark_all.is_none() && self.last_mark_all.is_some_and(|e| e <= issued_epoch) {
            self.last_mark_all = None;
        }

        cache.replace(notifications, unread_count.saturating_sub(preserved));
    }

    /// Apply a lightweight count poll issued at `issued_epoch`.
    ///
    /// The poll is advisory: it is dropped if a local mutation happened since
    /// it was issued or a mark-all is unconfirmed, it discounts unconfirmed
    /// single marks, and it never drops below the unread items visible in the
    /// cached list. Returns the applied count, if any.
    pub fn apply_poll(
        &self,
        cache: &mut NotificationCache,
        server_count: u64,
        issued_epoch: u64,
    ) -> Option<u64> {
        if self.epoch > issued_epoch {
            tracing::debug!(issued_epoch, current = self.epoch, "Dropping count poll older than a local mutation");
            return None;
        }
        if self.mark_all_pending() {
            tracing::debug!("Dropping count poll while mark-all is unconfirmed");
            return None;
        }
        let adjusted = server_count.saturating_sub(self.pending_marks() as u64);
        let applied = adjusted.max(cache.unread_in_list());
        cache.set_unread_count(applied);
        Some(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::super::cache::tests::note;
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NotificationId {
        NotificationId::from(s)
    }

    fn seeded(unread: &[&str], count: u64) -> NotificationCache {
        let mut cache = NotificationCache::new();
        cache.replace(unread.iter().map(|i| note(i, false)).collect(), count);
        cache
    }

    fn response(items: &[(&str, bool)], count: u64) -> RecentNotifications {
        RecentNotifications {
            notifications: items.iter().map(|(i, r)| note(i, *r)).collect(),
            unread_count: count,
        }
    }

    #[test]
    fn test_begin_mark_bumps_epoch() {
        let mut cache = seeded(&["a", "b"], 2);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        assert_eq!(rec.begin_mark(&mut cache, &id("a")), Some(1));
        assert_eq!(rec.begin_mark(&mut cache, &id("a")), None);
        assert_eq!(rec.epoch(), 1);
        assert_eq!(rec.pending_marks(), 1);
        assert_eq!(cache.unread_count(), 1);
    }

    #[test]
    fn test_failure_kept_by_default() {
        let mut cache = seeded(&["a"], 1);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        let changed = rec.fail_mark(&mut cache, &id("a"), epoch, &GatewayError::Timeout);
        assert!(!changed);
        assert!(cache.get(&id("a")).unwrap().is_read);
        assert_eq!(cache.unread_count(), 0);
        assert_eq!(rec.pending_marks(), 0);
    }

    #[test]
    fn test_failure_reverted_with_revert_policy() {
        let mut cache = seeded(&["a"], 4);
        let mut rec = Reconciler::new(RollbackPolicy::Revert);
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        assert!(rec.fail_mark(&mut cache, &id("a"), epoch, &GatewayError::Server(500)));
        assert!(!cache.get(&id("a")).unwrap().is_read);
        assert_eq!(cache.unread_count(), 4);
    }

    #[test]
    fn test_not_found_never_reverts() {
        let mut cache = seeded(&["a"], 1);
        let mut rec = Reconciler::new(RollbackPolicy::Revert);
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        assert!(!rec.fail_mark(&mut cache, &id("a"), epoch, &GatewayError::NotFound));
        assert!(cache.get(&id("a")).unwrap().is_read);
    }

    #[test]
    fn test_mark_all_revert_restores_previous_state() {
        let mut cache = seeded(&["a", "b"], 7);
        let mut rec = Reconciler::new(RollbackPolicy::Revert);
        let epoch = rec.begin_mark_all(&mut cache);
        assert_eq!(cache.unread_count(), 0);
        assert!(rec.fail_mark_all(&mut cache, epoch));
        assert_eq!(cache.unread_in_list(), 2);
        assert_eq!(cache.unread_count(), 7);
        assert!(!rec.mark_all_pending());
    }

    #[test]
    fn test_mark_all_failure_kept_by_default() {
        let mut cache = seeded(&["a", "b"], 7);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        let epoch = rec.begin_mark_all(&mut cache);
        assert!(!rec.fail_mark_all(&mut cache, epoch));
        assert_eq!(cache.unread_count(), 0);
    }

    #[test]
    fn test_list_issued_before_mark_keeps_local_read() {
        let mut cache = seeded(&["a", "b"], 2);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        let issued = rec.epoch();
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        rec.confirm_mark(&id("a"), epoch);

        // Server snapshot taken before the mark reached it
        rec.apply_list(&mut cache, response(&[("a", false), ("b", false)], 2), issued, 10);
        assert!(cache.get(&id("a")).unwrap().is_read);
        assert_eq!(cache.unread_count(), 1);
    }

    #[test]
    fn test_list_after_confirmed_mark_is_authoritative() {
        let mut cache = seeded(&["a"], 1);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        rec.confirm_mark(&id("a"), epoch);

        // Issued after the mark was confirmed, yet the server says unread
        // (e.g. marked unread elsewhere): the server wins
        let issued = rec.epoch();
        rec.apply_list(&mut cache, response(&[("a", false)], 1), issued, 10);
        assert!(!cache.get(&id("a")).unwrap().is_read);
        assert_eq!(cache.unread_count(), 1);
    }

    #[test]
    fn test_list_during_unconfirmed_mark_keeps_local_read() {
        let mut cache = seeded(&["a"], 1);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        rec.begin_mark(&mut cache, &id("a")).unwrap();
        let issued = rec.epoch();
        rec.apply_list(&mut cache, response(&[("a", false)], 3), issued, 10);
        assert!(cache.get(&id("a")).unwrap().is_read);
        assert_eq!(cache.unread_count(), 2);
    }

    #[test]
    fn test_unconfirmed_mark_all_only_covers_marked_items() {
        let mut cache = seeded(&["a"], 1);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        rec.begin_mark_all(&mut cache);
        let issued = rec.epoch();

        // "b" arrived on the server after the mark-all was processed
        rec.apply_list(&mut cache, response(&[("b", false), ("a", false)], 2), issued, 10);
        assert!(cache.get(&id("a")).unwrap().is_read);
        assert!(!cache.get(&id("b")).unwrap().is_read);
        assert_eq!(cache.unread_count(), 1);
        assert!(rec.mark_all_pending());
    }

    #[test]
    fn test_revert_after_superseding_list_is_skipped() {
        let mut cache = seeded(&["a"], 1);
        let mut rec = Reconciler::new(RollbackPolicy::Revert);
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        rec.confirm_mark(&id("a"), epoch);
        let issued = rec.epoch();
        rec.apply_list(&mut cache, response(&[("a", true)], 0), issued, 10);

        // A late failure for the old epoch must not touch the newer state
        assert!(!rec.fail_mark(&mut cache, &id("a"), epoch, &GatewayError::Timeout));
        assert!(cache.get(&id("a")).unwrap().is_read);
    }

    #[test]
    fn test_list_truncated_to_limit() {
        let mut cache = NotificationCache::new();
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        let items: Vec<(String, bool)> = (0..15).map(|i| (format!("n{}", i), false)).collect();
        let refs: Vec<(&str, bool)> = items.iter().map(|(s, r)| (s.as_str(), *r)).collect();
        rec.apply_list(&mut cache, response(&refs, 15), 0, 10);
        assert_eq!(cache.notifications().len(), 10);
        assert_eq!(cache.unread_count(), 15);
    }

    #[test]
    fn test_poll_sets_count_when_idle() {
        let mut cache = seeded(&["a"], 1);
        let rec = Reconciler::new(RollbackPolicy::Keep);
        assert_eq!(rec.apply_poll(&mut cache, 6, 0), Some(6));
        assert_eq!(cache.unread_count(), 6);
    }

    #[test]
    fn test_poll_may_decrease_but_not_below_visible_unread() {
        let mut cache = seeded(&["a", "b"], 5);
        let rec = Reconciler::new(RollbackPolicy::Keep);
        assert_eq!(rec.apply_poll(&mut cache, 0, 0), Some(2));
        assert_eq!(cache.unread_count(), 2);
    }

    #[test]
    fn test_poll_issued_before_mutation_dropped() {
        let mut cache = seeded(&["a"], 3);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        let issued = rec.epoch();
        let epoch = rec.begin_mark(&mut cache, &id("a")).unwrap();
        rec.confirm_mark(&id("a"), epoch);
        assert_eq!(rec.apply_poll(&mut cache, 3, issued), None);
        assert_eq!(cache.unread_count(), 2);
    }

    #[test]
    fn test_poll_discounts_unconfirmed_marks() {
        let mut cache = seeded(&["a", "b"], 4);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        rec.begin_mark(&mut cache, &id("a")).unwrap();
        let issued = rec.epoch();
        // Server has not processed the mark yet and still reports 4
        assert_eq!(rec.apply_poll(&mut cache, 4, issued), Some(3));
    }

    #[test]
    fn test_poll_ignored_during_mark_all() {
        let mut cache = seeded(&["a"], 4);
        let mut rec = Reconciler::new(RollbackPolicy::Keep);
        rec.begin_mark_all(&mut cache);
        let issued = rec.epoch();
        assert_eq!(rec.apply_poll(&mut cache, 4, issued), None);
        assert_eq!(cache.unread_count(), 0);
    }
}

//! Completion events from background tasks and how the owner applies them.

use super::center::NotificationCenter;
use crate::gateway::GatewayError;
use crate::model::{NotificationId, RecentNotifications};

/// Message delivered to the [`NotificationCenter`] owner.
#[derive(Debug)]
pub enum SyncEvent {
    /// The poll interval elapsed.
    PollDue,
    CountFetched {
        epoch: u64,
        result: Result<u64, GatewayError>,
    },
    ListFetched {
        generation: u64,
        epoch: u64,
        result: Result<RecentNotifications, GatewayError>,
    },
    MarkReadDone {
        id: NotificationId,
        epoch: u64,
        result: Result<(), GatewayError>,
    },
    MarkAllDone {
        epoch: u64,
        result: Result<(), GatewayError>,
    },
}

impl SyncEvent {
    /// Whether this event settles a spawned request.
    fn is_completion(&self) -> bool {
        !matches!(self, SyncEvent::PollDue)
    }
}

const LIST_ERROR_MESSAGE: &str = "Failed to load notifications";

impl NotificationCenter {
    /// Apply one event to the owned state.
    pub fn handle_event(&mut self, event: SyncEvent) {
        if event.is_completion() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        if !self.mounted {
            tracing::trace!(?event, "Ignoring event after unmount");
            return;
        }

        match event {
            SyncEvent::PollDue => {
                tracing::trace!("Count poll due");
                self.spawn_count_poll();
            }

            SyncEvent::CountFetched { epoch, result } => match result {
                Ok(count) => {
                    self.clear_auth_failure();
                    let before = self.cache.unread_count();
                    if let Some(applied) = self.reconciler.apply_poll(&mut self.cache, count, epoch) {
                        if applied != before {
                            tracing::debug!(server = count, applied, "Unread count updated");
                            self.touch();
                        }
                    }
                }
                Err(e) => {
                    // Background poll failures never surface inline
                    if e.is_network() {
                        tracing::debug!(error = %e, "Unread count poll could not reach the server");
                    } else {
                        tracing::warn!(error = %e, "Unread count poll failed");
                    }
                    self.note_auth_failure(&e);
                }
            },

            SyncEvent::ListFetched {
                generation,
                epoch,
                result,
            } => {
                if !self.scheduler.finish_list(generation) {
                    tracing::debug!(generation, "Dropping stale list response");
                    return;
                }
                self.loading = false;
                match result {
                    Ok(response) => {
                        self.clear_auth_failure();
                        self.error = None;
                        let count = response.notifications.len();
                        self.reconciler
                            .apply_list(&mut self.cache, response, epoch, self.config.fetch_limit);
                        tracing::debug!(
                            generation,
                            count,
                            unread = self.cache.unread_count(),
                            "Notification list refreshed"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(generation, error = %e, "Notification list refresh failed");
                        self.note_auth_failure(&e);
                        self.error = Some(LIST_ERROR_MESSAGE.to_string());
                    }
                }
                self.touch();
            }

            SyncEvent::MarkReadDone { id, epoch, result } => match result {
                Ok(()) => {
                    tracing::debug!(id = %id, "Mark read confirmed");
                    self.reconciler.confirm_mark(&id, epoch);
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Mark read failed");
                    self.note_auth_failure(&e);
                    if self.reconciler.fail_mark(&mut self.cache, &id, epoch, &e) {
                        tracing::info!(id = %id, "Reverted optimistic mark read");
                        self.touch();
                    }
                }
            },

            SyncEvent::MarkAllDone { epoch, result } => match result {
                Ok(()) => {
                    tracing::debug!("Mark all read confirmed");
                    self.reconciler.confirm_mark_all(epoch);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Mark all read failed");
                    self.note_auth_failure(&e);
                    if self.reconciler.fail_mark_all(&mut self.cache, epoch) {
                        tracing::info!("Reverted optimistic mark all read");
                        self.touch();
                    }
                }
            },
        }
    }

    fn clear_auth_failure(&mut self) {
        if self.needs_reauth {
            self.needs_reauth = false;
            self.touch();
        }
    }

    fn note_auth_failure(&mut self, error: &GatewayError) {
        if *error == GatewayError::Auth && !self.needs_reauth {
            tracing::warn!("Gateway rejected credentials; re-authentication required");
            self.needs_reauth = true;
            self.touch();
        }
    }
}

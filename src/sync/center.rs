use super::cache::NotificationCache;
use super::dropdown::{Dropdown, ListenerRegistry, UiEvent};
use super::events::SyncEvent;
use super::reconcile::Reconciler;
use super::scheduler::Scheduler;
use super::task::catch_task_panic;
use super::{Navigator, SyncConfig};
use crate::gateway::{GatewayError, NotificationGateway};
use crate::model::{Notification, NotificationId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of the completion channel. Each in-flight request holds at most
/// one slot, so this only bounds bursts of rapid user actions.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Largest count shown verbatim on the badge.
const BADGE_MAX: u64 = 99;

/// Badge text for an unread count: hidden at zero, capped at "99+".
pub fn badge_label(count: u64) -> Option<String> {
    match count {
        0 => None,
        n if n > BADGE_MAX => Some(format!("{}+", BADGE_MAX)),
        n => Some(n.to_string()),
    }
}

/// Renderable snapshot of the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationView {
    pub is_open: bool,
    pub notifications: Arc<Vec<Notification>>,
    pub unread_count: u64,
    pub badge: Option<String>,
    /// A full-list refresh is in flight.
    pub loading: bool,
    /// Inline error from the last full-list refresh, with retry via
    /// [`NotificationCenter::refresh`].
    pub error: Option<String>,
    /// Whether the "Mark all read" action should be offered.
    pub show_mark_all: bool,
    /// The server rejected our credentials; the host should re-authenticate.
    pub needs_reauth: bool,
}

impl NotificationView {
    /// Empty-state message applies: nothing cached, nothing loading, no error.
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && !self.loading && self.error.is_none()
    }
}

/// The notification widget's sync core.
///
/// Single owner of the cache. Gateway calls run in spawned tasks that report
/// back as [`SyncEvent`]s; the owner applies them one at a time through
/// [`NotificationCenter::handle_event`], so no locking is needed.
///
/// The host drives it by awaiting [`NotificationCenter::next_event`]
/// (completions and poll ticks) alongside its own input, and by calling the
/// action methods. Must be mounted inside a tokio runtime.
pub struct NotificationCenter {
    pub(super) gateway: Arc<dyn NotificationGateway>,
    pub(super) config: SyncConfig,
    pub(super) cache: NotificationCache,
    pub(super) reconciler: Reconciler,
    pub(super) scheduler: Scheduler,
    pub(super) dropdown: Dropdown,
    pub(super) listeners: ListenerRegistry,
    pub(super) navigator: Box<dyn Navigator>,
    pub(super) loading: bool,
    pub(super) error: Option<String>,
    pub(super) needs_reauth: bool,
    pub(super) mounted: bool,
    /// Bumped on every state write; the host redraws when it changes.
    pub(super) revision: u64,
    /// Spawned requests whose completion has not been handled yet.
    pub(super) in_flight: usize,
    pub(super) event_tx: mpsc::Sender<SyncEvent>,
    pub(super) event_rx: mpsc::Receiver<SyncEvent>,
}

impl NotificationCenter {
    /// Mount the widget: start the count poll and fire the first poll
    /// immediately. The list stays empty until the dropdown is first opened.
    pub fn mount(
        gateway: Arc<dyn NotificationGateway>,
        config: SyncConfig,
        navigator: Box<dyn Navigator>,
        listeners: ListenerRegistry,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut scheduler = Scheduler::new();
        scheduler.start(config.poll_interval);

        tracing::info!(
            poll_interval_secs = config.poll_interval.as_secs(),
            fetch_limit = config.fetch_limit,
            rollback = ?config.rollback,
            "Notification center mounted"
        );

        let mut center = Self {
            gateway,
            reconciler: Reconciler::new(config.rollback),
            config,
            cache: NotificationCache::new(),
            scheduler,
            dropdown: Dropdown::Closed,
            listeners,
            navigator,
            loading: false,
            error: None,
            needs_reauth: false,
            mounted: true,
            revision: 0,
            in_flight: 0,
            event_tx,
            event_rx,
        };
        center.spawn_count_poll();
        center
    }

    /// Tear down: stop the poll timer and detach dismissal listeners.
    ///
    /// In-flight requests are not aborted (a mark-read must still reach the
    /// server) but their completions are ignored from now on.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.scheduler.stop();
        self.dropdown.close();
        self.loading = false;
        self.touch();
        self.mounted = false;
        tracing::info!(in_flight = self.in_flight, "Notification center unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Requests spawned but not yet handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn view(&self) -> NotificationView {
        let notifications = Arc::clone(self.cache.notifications());
        let show_mark_all = notifications.iter().any(|n| !n.is_read);
        NotificationView {
            is_open: self.dropdown.is_open(),
            unread_count: self.cache.unread_count(),
            badge: badge_label(self.cache.unread_count()),
            notifications,
            loading: self.loading,
            error: self.error.clone(),
            show_mark_all,
            needs_reauth: self.needs_reauth,
        }
    }

    pub(super) fn touch(&mut self) {
        if self.mounted {
            self.revision = self.revision.wrapping_add(1);
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Bell activation: Closed → Open, then refresh the list.
    pub fn open(&mut self) {
        if !self.mounted || !self.dropdown.open(&self.listeners) {
            return;
        }
        tracing::debug!("Dropdown opened");
        self.touch();
        self.request_list(false);
    }

    /// Explicit close. Cached data is kept.
    pub fn close(&mut self) {
        if self.dropdown.close() {
            tracing::debug!("Dropdown closed");
            self.touch();
        }
    }

    pub fn toggle(&mut self) {
        if self.dropdown.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Route an outside-click or Escape from the host.
    /// Returns true if the dropdown closed.
    pub fn dispatch(&mut self, event: UiEvent) -> bool {
        let closed = self.dropdown.handle(event);
        if closed {
            tracing::debug!(?event, "Dropdown dismissed");
            self.touch();
        }
        closed
    }

    /// Retry affordance: always issues a new list request, superseding any
    /// request still in flight.
    pub fn refresh(&mut self) {
        if self.mounted {
            self.request_list(true);
        }
    }

    /// Optimistically mark `id` read and confirm with the server in the
    /// background. Returns false if the item is not cached or already read.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        if !self.mounted {
            return false;
        }
        let Some(epoch) = self.reconciler.begin_mark(&mut self.cache, id) else {
            tracing::debug!(id = %id, "mark_read skipped: not cached or already read");
            return false;
        };
        self.touch();

        let gateway = Arc::clone(&self.gateway);
        let id_for_task = id.clone();
        let id_on_panic = id.clone();
        self.spawn_request(
            "mark_read",
            async move {
                let result = gateway.mark_read(&id_for_task).await;
                SyncEvent::MarkReadDone {
                    id: id_for_task,
                    epoch,
                    result,
                }
            },
            move |error| SyncEvent::MarkReadDone {
                id: id_on_panic,
                epoch,
                result: Err(error),
            },
        );
        true
    }

    /// Optimistically mark everything read and confirm in the background.
    pub fn mark_all_read(&mut self) {
        if !self.mounted {
            return;
        }
        let epoch = self.reconciler.begin_mark_all(&mut self.cache);
        self.touch();

        let gateway = Arc::clone(&self.gateway);
        self.spawn_request(
            "mark_all_read",
            async move {
                let result = gateway.mark_all_read().await;
                SyncEvent::MarkAllDone { epoch, result }
            },
            move |error| SyncEvent::MarkAllDone {
                epoch,
                result: Err(error),
            },
        );
    }

    /// Click on a notification row.
    ///
    /// Marks it read if needed (fire-and-forget), then navigates to its
    /// `actionUrl` without waiting for the server. Navigation closes the
    /// dropdown. Returns the navigation target, if any.
    pub fn activate(&mut self, id: &NotificationId) -> Option<String> {
        if !self.mounted {
            return None;
        }
        let notification = self.cache.get(id)?;
        let is_unread = !notification.is_read;
        let target = notification.action_url.clone();

        if is_unread {
            self.mark_read(id);
        }
        if let Some(url) = &target {
            tracing::info!(id = %id, target = %url, "Navigating from notification");
            self.navigator.navigate(url);
            self.close();
        }
        target
    }

    // ------------------------------------------------------------------
    // Request spawning
    // ------------------------------------------------------------------

    pub(super) fn spawn_count_poll(&mut self) {
        let gateway = Arc::clone(&self.gateway);
        let epoch = self.reconciler.epoch();
        self.spawn_request(
            "count_poll",
            async move {
                let result = gateway.fetch_unread_count().await;
                SyncEvent::CountFetched { epoch, result }
            },
            move |error| SyncEvent::CountFetched {
                epoch,
                result: Err(error),
            },
        );
    }

    fn request_list(&mut self, force: bool) {
        let Some(generation) = self.scheduler.begin_list(force) else {
            tracing::debug!("List refresh already in flight, not issuing another");
            return;
        };
        self.loading = true;
        self.error = None;
        self.touch();

        let gateway = Arc::clone(&self.gateway);
        let epoch = self.reconciler.epoch();
        let limit = self.config.fetch_limit;
        tracing::debug!(generation, epoch, limit, "Requesting notification list");
        self.spawn_request(
            "list_refresh",
            async move {
                let result = gateway.fetch_recent(limit).await;
                SyncEvent::ListFetched {
                    generation,
                    epoch,
                    result,
                }
            },
            move |error| SyncEvent::ListFetched {
                generation,
                epoch,
                result: Err(error),
            },
        );
    }

    /// Spawn a gateway call. A panic inside it is reported as a failed
    /// request via `on_panic`, so every spawned request yields exactly one
    /// completion event.
    fn spawn_request<F, P>(&mut self, task: &'static str, request: F, on_panic: P)
    where
        F: Future<Output = SyncEvent> + Send + 'static,
        P: FnOnce(GatewayError) -> SyncEvent + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match catch_task_panic(request).await {
                Ok(event) => event,
                Err(panic_msg) => {
                    tracing::error!(task, error = %panic_msg, "Background task panicked");
                    on_panic(GatewayError::Network(format!("{} task panicked: {}", task, panic_msg)))
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
            }
        });
    }

    // ------------------------------------------------------------------
    // Event pump
    // ------------------------------------------------------------------

    /// Wait for the next completion or poll tick.
    ///
    /// Returns `None` once the poll has stopped with nothing left in flight.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        if !self.scheduler.is_polling() && self.in_flight == 0 {
            return None;
        }
        tokio::select! {
            biased;

            Some(event) = self.event_rx.recv() => Some(event),

            _ = self.scheduler.tick() => Some(SyncEvent::PollDue),
        }
    }

    /// Wait for and apply one event. Returns false once there is nothing
    /// left to wait for.
    pub async fn step(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply every completion that is already queued, without waiting.
    pub fn drain_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Apply completions until no request is in flight. Poll ticks are not
    /// awaited, so this never starts new background work by itself.
    pub async fn settle(&mut self) {
        loop {
            self.drain_ready();
            if self.in_flight == 0 {
                break;
            }
            match self.event_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.unmount();
    }
}

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Upper bound on the count-poll period.
pub const MAX_POLL_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Drives the two refresh timelines.
///
/// - The background count poll is an `Interval` owned here. Dropping it in
///   [`Scheduler::stop`] is the whole teardown: there is no detached timer
///   task that could outlive the widget.
/// - Full-list refreshes are tracked by a generation counter. Only the
///   completion carrying the latest generation is applied; older ones are
///   stale and dropped.
#[derive(Debug)]
pub struct Scheduler {
    poll: Option<Interval>,
    list_generation: u64,
    list_in_flight: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            poll: None,
            list_generation: 0,
            list_in_flight: false,
        }
    }

    /// Start the count poll. The first tick fires one `period` from now;
    /// the caller issues the immediate mount-time poll itself.
    ///
    /// Periods are clamped to one second..[`MAX_POLL_PERIOD`].
    pub fn start(&mut self, period: Duration) {
        let period = period.clamp(Duration::from_secs(1), MAX_POLL_PERIOD);
        let now = Instant::now();
        let first = now.checked_add(period).unwrap_or(now);
        let mut interval = tokio::time::interval_at(first, period);
        // A stalled owner gets one catch-up tick, not a burst
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll = Some(interval);
    }

    pub fn stop(&mut self) {
        self.poll = None;
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// Resolves at the next poll tick; never resolves once stopped.
    pub async fn tick(&mut self) {
        match self.poll.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Claim a new list-request generation.
    ///
    /// Without `force`, returns `None` while another list request is in
    /// flight (open/close flapping must not stack requests). With `force`
    /// the new request supersedes the in-flight one.
    pub fn begin_list(&mut self, force: bool) -> Option<u64> {
        if self.list_in_flight && !force {
            return None;
        }
        self.list_generation = self.list_generation.wrapping_add(1);
        self.list_in_flight = true;
        Some(self.list_generation)
    }

    /// Record a list completion. Returns true if it belongs to the latest
    /// generation and should be applied.
    pub fn finish_list(&mut self, generation: u64) -> bool {
        if generation != self.list_generation {
            return false;
        }
        self.list_in_flight = false;
        true
    }

    pub fn list_in_flight(&self) -> bool {
        self.list_in_flight
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

//! Dropdown open/closed state and dismissal listener lifetime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Where a pointer press landed, as resolved by the host's hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The bell button itself. Its own click handler toggles the dropdown.
    Trigger,
    Panel,
    Outside,
}

/// Host input relevant to dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    PointerDown(PointerTarget),
    Escape,
}

/// Registry of the host's global dismissal listeners (outside-click and
/// Escape).
///
/// Attaching returns a [`ListenerGuard`]; dropping the guard detaches. The
/// registry is cheap to clone and shared with the host, which can query
/// [`ListenerRegistry::active`] to decide whether to route global input.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    active: Arc<AtomicUsize>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self) -> ListenerGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Dismissal listeners attached");
        ListenerGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Number of attached listener sets.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Attached dismissal listeners; detached on drop.
#[derive(Debug)]
pub struct ListenerGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("Dismissal listeners detached");
    }
}

/// Two-state dropdown machine. The listeners exist exactly as long as the
/// `Open` state does.
#[derive(Debug, Default)]
pub enum Dropdown {
    #[default]
    Closed,
    Open { _listeners: ListenerGuard },
}

impl Dropdown {
    pub fn is_open(&self) -> bool {
        matches!(self, Dropdown::Open { .. })
    }

    /// Closed → Open. Returns true on an actual transition.
    pub fn open(&mut self, registry: &ListenerRegistry) -> bool {
        if self.is_open() {
            return false;
        }
        *self = Dropdown::Open {
            _listeners: registry.attach(),
        };
        true
    }

    /// Open → Closed. Returns true on an actual transition.
    pub fn close(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        *self = Dropdown::Closed;
        true
    }

    /// Route a dismissal event. Returns true if it closed the dropdown.
    ///
    /// While closed there is no listener, so every event is ignored.
    pub fn handle(&mut self, event: UiEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        match event {
            UiEvent::Escape | UiEvent::PointerDown(PointerTarget::Outside) => self.close(),
            UiEvent::PointerDown(PointerTarget::Trigger | PointerTarget::Panel) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_count_follows_state() {
        let registry = ListenerRegistry::new();
        let mut dropdown = Dropdown::default();
        assert_eq!(registry.active(), 0);

        for _ in 0..5 {
            assert!(dropdown.open(&registry));
            assert_eq!(registry.active(), 1);
            assert!(!dropdown.open(&registry), "re-open is a no-op");
            assert_eq!(registry.active(), 1);
            assert!(dropdown.close());
            assert_eq!(registry.active(), 0);
        }
    }

    #[test]
    fn test_outside_click_and_escape_close() {
        let registry = ListenerRegistry::new();
        let mut dropdown = Dropdown::default();

        dropdown.open(&registry);
        assert!(dropdown.handle(UiEvent::PointerDown(PointerTarget::Outside)));
        assert!(!dropdown.is_open());

        dropdown.open(&registry);
        assert!(dropdown.handle(UiEvent::Escape));
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_inside_clicks_keep_open() {
        let registry = ListenerRegistry::new();
        let mut dropdown = Dropdown::default();
        dropdown.open(&registry);
        assert!(!dropdown.handle(UiEvent::PointerDown(PointerTarget::Panel)));
        assert!(!dropdown.handle(UiEvent::PointerDown(PointerTarget::Trigger)));
        assert!(dropdown.is_open());
    }

    #[test]
    fn test_events_ignored_while_closed() {
        let mut dropdown = Dropdown::default();
        assert!(!dropdown.handle(UiEvent::Escape));
        assert!(!dropdown.handle(UiEvent::PointerDown(PointerTarget::Outside)));
    }

    #[test]
    fn test_dropping_open_dropdown_detaches() {
        let registry = ListenerRegistry::new();
        {
            let mut dropdown = Dropdown::default();
            dropdown.open(&registry);
            assert_eq!(registry.active(), 1);
        }
        assert_eq!(registry.active(), 0);
    }
}

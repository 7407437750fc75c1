//! Keyboard and mouse handling.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::sync::{NotificationCenter, PointerTarget, UiEvent};

use super::loop_runner::Action;
use super::state::UiState;

pub(super) fn handle_key(center: &mut NotificationCenter, state: &mut UiState, key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::Continue;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    let view = center.view();
    match key.code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Esc => {
            center.dispatch(UiEvent::Escape);
        }
        KeyCode::Char('n') => center.toggle(),
        KeyCode::Enter => {
            if view.is_open {
                if let Some(n) = view.notifications.get(state.selected) {
                    center.activate(&n.id);
                }
            } else {
                center.open();
            }
        }
        KeyCode::Char('j') | KeyCode::Down if view.is_open => state.select_next(&view),
        KeyCode::Char('k') | KeyCode::Up if view.is_open => state.select_prev(),
        KeyCode::Char('m') if view.is_open => {
            if let Some(n) = view.notifications.get(state.selected) {
                center.mark_read(&n.id);
            }
        }
        KeyCode::Char('a') if view.is_open && view.show_mark_all => center.mark_all_read(),
        KeyCode::Char('r') if view.is_open => center.refresh(),
        _ => {}
    }
    Action::Continue
}

pub(super) fn handle_mouse(center: &mut NotificationCenter, state: &mut UiState, mouse: MouseEvent) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    let target = state.hit_test(mouse.column, mouse.row);
    center.dispatch(UiEvent::PointerDown(target));

    match target {
        // The bell's own click handler
        PointerTarget::Trigger => center.toggle(),
        PointerTarget::Panel => {
            if let Some(index) = state.row_at(mouse.column, mouse.row) {
                state.selected = index;
                let view = center.view();
                if let Some(n) = view.notifications.get(index) {
                    center.activate(&n.id);
                }
            }
        }
        PointerTarget::Outside => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayOp, InMemoryGateway};
    use crate::model::{Notification, NotificationId, NotificationKind};
    use crate::sync::{ListenerRegistry, Navigator, SyncConfig};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use crossterm::event::KeyEventState;
    use ratatui::layout::Rect;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Navigator for Recorder {
        fn navigate(&mut self, target: &str) {
            self.0.lock().unwrap().push(target.to_string());
        }
    }

    /// Notes built in one test share a timestamp, so the server keeps them
    /// in the order given.
    fn note(id: &str, url: Option<&str>) -> Notification {
        Notification {
            id: NotificationId::from(id),
            kind: NotificationKind::Interview,
            title: Arc::from(id),
            message: Arc::from(""),
            is_read: false,
            action_url: url.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    async fn mounted(
        notes: Vec<Notification>,
    ) -> (NotificationCenter, Arc<InMemoryGateway>, Recorder) {
        let gw = Arc::new(InMemoryGateway::with_notifications(notes));
        let recorder = Recorder::default();
        let mut center = NotificationCenter::mount(
            gw.clone(),
            SyncConfig::default(),
            Box::new(recorder.clone()),
            ListenerRegistry::new(),
        );
        center.settle().await;
        (center, gw, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_drive_dropdown() {
        let (mut center, _, _) = mounted(vec![note("a", None)]).await;
        let mut state = UiState::new();

        handle_key(&mut center, &mut state, key(KeyCode::Char('n')));
        assert!(center.view().is_open);
        handle_key(&mut center, &mut state, key(KeyCode::Esc));
        assert!(!center.view().is_open);
        assert!(matches!(
            handle_key(&mut center, &mut state, key(KeyCode::Char('q'))),
            Action::Quit
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_activates_selected() {
        let mut older = note("b", Some("/offers/b"));
        older.created_at = older.created_at - ChronoDuration::minutes(5);
        let (mut center, gw, recorder) = mounted(vec![note("a", None), older]).await;
        let mut state = UiState::new();
        center.open();
        center.settle().await;

        handle_key(&mut center, &mut state, key(KeyCode::Char('j')));
        assert_eq!(state.selected, 1);
        handle_key(&mut center, &mut state, key(KeyCode::Enter));
        center.settle().await;

        assert_eq!(*recorder.0.lock().unwrap(), vec!["/offers/b".to_string()]);
        assert_eq!(gw.is_read(&NotificationId::from("b")), Some(true));
        assert!(!center.view().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_all_key_only_when_unread() {
        let (mut center, gw, _) = mounted(vec![note("a", None)]).await;
        let mut state = UiState::new();
        center.open();
        center.settle().await;

        handle_key(&mut center, &mut state, key(KeyCode::Char('a')));
        center.settle().await;
        handle_key(&mut center, &mut state, key(KeyCode::Char('a')));
        center.settle().await;
        assert_eq!(gw.calls(GatewayOp::MarkAllRead), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_outside_dismisses_and_bell_toggles() {
        let (mut center, _, _) = mounted(vec![note("a", None)]).await;
        let mut state = UiState {
            bell_area: Rect::new(0, 0, 6, 1),
            panel_area: Some(Rect::new(0, 1, 40, 8)),
            ..UiState::new()
        };

        handle_mouse(&mut center, &mut state, click(2, 0));
        assert!(center.view().is_open);
        handle_mouse(&mut center, &mut state, click(10, 4));
        assert!(center.view().is_open, "clicks inside the panel keep it open");
        handle_mouse(&mut center, &mut state, click(55, 4));
        assert!(!center.view().is_open);

        // Bell click while open closes via its own handler, not dismissal
        handle_mouse(&mut center, &mut state, click(2, 0));
        handle_mouse(&mut center, &mut state, click(2, 0));
        assert!(!center.view().is_open);
    }
}

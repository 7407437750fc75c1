use crate::sync::{NotificationView, PointerTarget};
use ratatui::layout::{Position, Rect};

/// Terminal-side state that the sync core does not own: selection, and the
/// screen regions last drawn (for mouse hit testing).
#[derive(Debug, Default)]
pub struct UiState {
    pub selected: usize,
    /// Index of the first row drawn in the panel.
    pub scroll: usize,
    pub bell_area: Rect,
    pub panel_area: Option<Rect>,
    /// Screen region of each drawn notification row and its list index.
    pub row_areas: Vec<(Rect, usize)>,
    /// Force a redraw on the next loop iteration (resize, clock tick).
    pub needs_redraw: bool,
    /// Sync-core revision of the last frame drawn.
    pub drawn_revision: Option<u64>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            needs_redraw: true,
            ..Self::default()
        }
    }

    /// Keep the selection inside the list after it changed length.
    pub fn clamp_selection(&mut self, view: &NotificationView) {
        let len = view.notifications.len();
        if len == 0 {
            self.selected = 0;
            self.scroll = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn select_next(&mut self, view: &NotificationView) {
        if self.selected + 1 < view.notifications.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Resolve a mouse press against the last drawn frame.
    pub fn hit_test(&self, column: u16, row: u16) -> PointerTarget {
        let pos = Position::new(column, row);
        if self.bell_area.contains(pos) {
            PointerTarget::Trigger
        } else if self.panel_area.is_some_and(|panel| panel.contains(pos)) {
            PointerTarget::Panel
        } else {
            PointerTarget::Outside
        }
    }

    /// List index of the notification row under the pointer, if any.
    pub fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let pos = Position::new(column, row);
        self.row_areas
            .iter()
            .find(|(area, _)| area.contains(pos))
            .map(|&(_, index)| index)
    }
}

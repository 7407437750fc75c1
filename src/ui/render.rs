//! Draws the bell, its dropdown panel and the key hint bar.

use crate::model::Notification;
use crate::sync::NotificationView;
use crate::util::{display_width, relative_time, single_line, truncate_to_width};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::state::UiState;

pub(super) const MIN_WIDTH: u16 = 30;
pub(super) const MIN_HEIGHT: u16 = 8;

/// Widest the dropdown panel gets.
const PANEL_MAX_WIDTH: u16 = 64;
/// Each notification takes a title line and a message line.
const ROW_HEIGHT: u16 = 2;

const BELL: &str = "🔔";

pub(super) fn render(f: &mut Frame, view: &NotificationView, state: &mut UiState, now: DateTime<Utc>) {
    let area = f.area();
    state.row_areas.clear();
    state.panel_area = None;

    if area.width < 1 || area.height < 1 {
        return;
    }
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = Paragraph::new(format!(
            "Terminal too small\n{}x{} needed",
            MIN_WIDTH, MIN_HEIGHT
        ))
        .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, view, state, chunks[0]);
    if view.is_open {
        render_panel(f, view, state, chunks[1], now);
    }
    render_hints(f, view, chunks[2]);
}

fn render_header(f: &mut Frame, view: &NotificationView, state: &mut UiState, area: Rect) {
    let mut spans = vec![Span::raw(format!(" {} ", BELL))];
    if let Some(badge) = &view.badge {
        spans.push(Span::styled(
            format!(" {} ", badge),
            Style::default()
                .bg(Color::Red)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let bell_width: u16 = spans
        .iter()
        .map(|s| display_width(&s.content) as u16)
        .sum();
    state.bell_area = Rect::new(area.x, area.y, bell_width.min(area.width), 1);

    let bell_style = if view.is_open {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    };
    spans[0].style = bell_style;
    spans.push(Span::styled("  Notifications", Style::default().fg(Color::Gray)));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_panel(
    f: &mut Frame,
    view: &NotificationView,
    state: &mut UiState,
    area: Rect,
    now: DateTime<Utc>,
) {
    let width = area.width.min(PANEL_MAX_WIDTH);
    let rows_wanted = view.notifications.len().max(1) as u16 * ROW_HEIGHT;
    // Borders plus the action line
    let height = (rows_wanted + 3).min(area.height);
    let panel = Rect::new(area.x, area.y, width, height);
    state.panel_area = Some(panel);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Notifications ");
    if view.show_mark_all {
        block = block.title_top(Line::from(" [a] Mark all read ").right_aligned());
    }

    f.render_widget(Clear, panel);
    let inner = block.inner(panel);
    f.render_widget(block, panel);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    if view.loading && view.notifications.is_empty() {
        f.render_widget(
            Paragraph::new("Loading...").style(Style::default().fg(Color::Gray)),
            inner,
        );
        return;
    }
    if let Some(error) = &view.error {
        let lines = vec![
            Line::styled(error.as_str(), Style::default().fg(Color::Red)),
            Line::styled("[r] Try again", Style::default().fg(Color::Yellow)),
        ];
        f.render_widget(Paragraph::new(lines), inner);
        return;
    }
    if view.notifications.is_empty() {
        f.render_widget(
            Paragraph::new("No notifications yet").style(Style::default().fg(Color::Gray)),
            inner,
        );
        return;
    }

    let mut list_area = inner;
    if view.loading {
        // Refresh over an already populated list: keep rows, show a marker
        f.render_widget(
            Paragraph::new("Refreshing...").style(Style::default().fg(Color::DarkGray)),
            Rect::new(inner.x, inner.y, inner.width, 1),
        );
        list_area = Rect::new(inner.x, inner.y + 1, inner.width, inner.height.saturating_sub(1));
    }

    let visible = (list_area.height / ROW_HEIGHT).max(1) as usize;
    if state.selected < state.scroll {
        state.scroll = state.selected;
    } else if state.selected >= state.scroll + visible {
        state.scroll = state.selected + 1 - visible;
    }

    for (slot, (index, notification)) in view
        .notifications
        .iter()
        .enumerate()
        .skip(state.scroll)
        .take(visible)
        .enumerate()
    {
        let y = list_area.y + slot as u16 * ROW_HEIGHT;
        let height = ROW_HEIGHT.min(list_area.bottom().saturating_sub(y));
        if height == 0 {
            break;
        }
        let row = Rect::new(list_area.x, y, list_area.width, height);
        render_row(f, notification, index == state.selected, row, now);
        state.row_areas.push((row, index));
    }
}

fn render_row(f: &mut Frame, n: &Notification, selected: bool, area: Rect, now: DateTime<Utc>) {
    let width = area.width as usize;
    let time = relative_time(n.created_at, now);
    let marker = if n.is_read { "  " } else { "● " };
    let prefix = format!("{}{} ", marker, n.kind.icon());
    let title_room = width.saturating_sub(display_width(&prefix) + display_width(&time) + 1);

    let title = single_line(&n.title);
    let title = truncate_to_width(&title, title_room);
    let pad = title_room.saturating_sub(display_width(&title));

    let title_style = if n.is_read {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let title_line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Cyan)),
        Span::styled(title.into_owned(), title_style),
        Span::raw(" ".repeat(pad + 1)),
        Span::styled(time, Style::default().fg(Color::DarkGray)),
    ]);

    let message = single_line(&n.message);
    let message = truncate_to_width(&message, width.saturating_sub(4));
    let message_line = Line::styled(
        format!("    {}", message),
        Style::default().fg(Color::DarkGray),
    );

    let mut paragraph = Paragraph::new(vec![title_line, message_line]);
    if selected {
        paragraph = paragraph.style(Style::default().bg(Color::DarkGray));
    }
    f.render_widget(paragraph, area);
}

fn render_hints(f: &mut Frame, view: &NotificationView, area: Rect) {
    let (text, style) = if view.needs_reauth {
        (
            "Session expired: update api_token and restart",
            Style::default().bg(Color::Red).fg(Color::White),
        )
    } else if view.is_open {
        (
            "[j/k] move [Enter] open [m] mark read [a] mark all [r] refresh [Esc] close [q] quit",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    } else {
        (
            "[n] notifications [q] quit",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    };
    let text = truncate_to_width(text, area.width as usize);
    f.render_widget(Paragraph::new(text).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NotificationId, NotificationKind};
    use chrono::TimeZone;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap()
    }

    fn item(id: &str, title: &str, is_read: bool) -> Notification {
        Notification {
            id: NotificationId::from(id),
            kind: NotificationKind::Offer,
            title: Arc::from(title),
            message: Arc::from("details"),
            is_read,
            action_url: None,
            created_at: now() - chrono::Duration::minutes(5),
        }
    }

    fn view(notifications: Vec<Notification>) -> NotificationView {
        let unread = notifications.iter().filter(|n| !n.is_read).count() as u64;
        NotificationView {
            is_open: true,
            show_mark_all: unread > 0,
            notifications: Arc::new(notifications),
            unread_count: unread,
            badge: crate::sync::badge_label(unread),
            loading: false,
            error: None,
            needs_reauth: false,
        }
    }

    fn draw(view: &NotificationView, state: &mut UiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| render(f, view, state, now())).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_open_panel_lists_rows_and_records_hit_areas() {
        let v = view(vec![item("a", "Offer from Acme", false), item("b", "Viewed", true)]);
        let mut state = UiState::new();
        let screen = draw(&v, &mut state);

        assert!(screen.contains("Offer from Acme"));
        assert!(screen.contains("5m ago"));
        assert!(screen.contains("Mark all read"));
        assert_eq!(state.row_areas.len(), 2);
        assert!(state.panel_area.is_some());
        assert!(state.bell_area.width > 0);
    }

    #[test]
    fn test_error_state_offers_retry() {
        let mut v = view(vec![]);
        v.error = Some("Failed to load notifications".to_string());
        let screen = draw(&v, &mut UiState::new());
        assert!(screen.contains("Failed to load notifications"));
        assert!(screen.contains("Try again"));
        assert!(!screen.contains("No notifications yet"));
    }

    #[test]
    fn test_empty_and_loading_states() {
        let v = view(vec![]);
        assert!(draw(&v, &mut UiState::new()).contains("No notifications yet"));

        let mut loading = view(vec![]);
        loading.loading = true;
        assert!(draw(&loading, &mut UiState::new()).contains("Loading..."));
    }

    #[test]
    fn test_closed_view_has_no_panel() {
        let mut v = view(vec![item("a", "Offer", false)]);
        v.is_open = false;
        let mut state = UiState::new();
        let screen = draw(&v, &mut state);
        assert!(state.panel_area.is_none());
        assert!(!screen.contains("Offer"));
        assert!(screen.contains(" 1 "), "badge shows unread count");
    }
}

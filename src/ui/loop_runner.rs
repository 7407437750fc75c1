//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, sync-core completions and poll ticks, a
//! clock tick for relative timestamps, and shutdown signals.

use crate::sync::{NotificationCenter, SyncEvent};
use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::input::{handle_key, handle_mouse};
use super::render::render;
use super::state::UiState;

/// Redraw cadence for "5m ago" style timestamps when nothing else changes.
const CLOCK_TICK: Duration = Duration::from_secs(30);

/// Result of handling a key press.
pub enum Action {
    Continue,
    Quit,
}

/// Whatever woke the loop up.
enum LoopInput {
    Shutdown(&'static str),
    Terminal(Option<std::io::Result<Event>>),
    Sync(Option<SyncEvent>),
    Clock,
}

/// Runs the bell widget until the user quits or a signal arrives, then
/// unmounts the sync core and restores the terminal.
///
/// Installs a panic hook that restores terminal state before unwinding.
pub async fn run(center: &mut NotificationCenter) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let result = event_loop(center, &mut terminal).await;

    center.unmount();
    restore_terminal(terminal)?;
    result
}

async fn event_loop(
    center: &mut NotificationCenter,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<()> {
    let mut state = UiState::new();
    let mut event_stream = crossterm::event::EventStream::new();
    let mut clock = tokio::time::interval(CLOCK_TICK);

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        // Completions that are already queued go first so rapid input
        // cannot starve them
        center.drain_ready();

        if state.needs_redraw || state.drawn_revision != Some(center.revision()) {
            let view = center.view();
            state.clamp_selection(&view);
            terminal.draw(|f| render(f, &view, &mut state, Utc::now()))?;
            state.drawn_revision = Some(center.revision());
            state.needs_redraw = false;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        let input = tokio::select! {
            biased;

            _ = sigterm_fut => LoopInput::Shutdown("SIGTERM"),
            _ = sigint_fut => LoopInput::Shutdown("SIGINT"),
            event = event_stream.next() => LoopInput::Terminal(event),
            event = center.next_event() => LoopInput::Sync(event),
            _ = clock.tick() => LoopInput::Clock,
        };

        match input {
            LoopInput::Shutdown(name) => {
                tracing::info!(signal = name, "Received signal, shutting down gracefully");
                break;
            }
            LoopInput::Terminal(Some(Ok(Event::Key(key)))) => {
                if let Action::Quit = handle_key(center, &mut state, key) {
                    break;
                }
                // Selection changes do not touch the sync core
                state.needs_redraw = true;
            }
            LoopInput::Terminal(Some(Ok(Event::Mouse(mouse)))) => {
                handle_mouse(center, &mut state, mouse);
            }
            LoopInput::Terminal(Some(Ok(Event::Resize(_, _)))) => state.needs_redraw = true,
            LoopInput::Terminal(Some(Ok(_))) => {}
            LoopInput::Terminal(Some(Err(e))) => {
                tracing::error!(error = %e, "Terminal input error");
                return Err(e.into());
            }
            LoopInput::Terminal(None) => {
                tracing::info!("Terminal input closed");
                break;
            }
            LoopInput::Sync(Some(event)) => center.handle_event(event),
            LoopInput::Sync(None) => break,
            LoopInput::Clock => state.needs_redraw = true,
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

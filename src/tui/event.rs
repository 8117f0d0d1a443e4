//! Async keyboard event handling for TUI
//!
//! Uses crossterm's EventStream for non-blocking, async-compatible input.
//! Commands are handed back to the caller, which spawns them on the
//! console so the render loop never waits on the network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tracing::warn;

use super::app::{AppState, InputTarget};
use crate::core::dispatcher::Command;

const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Result of processing a single event poll cycle
#[derive(Debug, PartialEq)]
pub enum EventResult {
    /// Continue the TUI loop
    Continue,
    /// User requested quit
    Quit,
    /// User issued a command
    Dispatch(Command),
}

/// Poll for keyboard events asynchronously with a timeout.
///
/// I/O errors are logged as warnings rather than silently swallowed.
pub async fn handle_events_async(
    app_state: &Arc<Mutex<AppState>>,
    shutdown_tx: &broadcast::Sender<()>,
    event_stream: &mut EventStream,
) -> EventResult {
    let maybe_event = tokio::time::timeout(POLL_TIMEOUT, event_stream.next()).await;

    match maybe_event {
        Err(_) => EventResult::Continue,
        // Stream ended (terminal closed)
        Ok(None) => EventResult::Quit,
        Ok(Some(Err(e))) => {
            warn!(event_type = "TERMINAL_IO_ERROR", error = %e, "Terminal I/O error during event polling");
            EventResult::Continue
        }
        Ok(Some(Ok(Event::Key(key)))) if key.kind != KeyEventKind::Release => {
            process_key_event(key, app_state, shutdown_tx)
        }
        Ok(Some(Ok(_))) => EventResult::Continue,
    }
}

fn lock(app_state: &Arc<Mutex<AppState>>) -> std::sync::MutexGuard<'_, AppState> {
    app_state.lock().unwrap_or_else(|e| e.into_inner())
}

fn quit(app_state: &Arc<Mutex<AppState>>, shutdown_tx: &broadcast::Sender<()>) -> EventResult {
    lock(app_state).should_quit = true;
    let _ = shutdown_tx.send(());
    EventResult::Quit
}

/// Process a single key event and update state accordingly
pub fn process_key_event(
    key: KeyEvent,
    app_state: &Arc<Mutex<AppState>>,
    shutdown_tx: &broadcast::Sender<()>,
) -> EventResult {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return quit(app_state, shutdown_tx);
    }

    if lock(app_state).input.is_some() {
        return process_input_key(key.code, app_state);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => quit(app_state, shutdown_tx),

        // Engine
        KeyCode::Char('s') => EventResult::Dispatch(Command::Start),
        KeyCode::Char('x') => EventResult::Dispatch(Command::Stop),
        KeyCode::Char('h') => EventResult::Dispatch(Command::RpcCheck),
        KeyCode::Char('T') => EventResult::Dispatch(Command::SelfTest),
        KeyCode::Char('u') => EventResult::Dispatch(Command::ReloadSettings),

        // Selectors
        KeyCode::Char('m') => EventResult::Dispatch(lock(app_state).next_mode_command()),
        KeyCode::Char('c') => EventResult::Dispatch(lock(app_state).next_chain_command()),
        KeyCode::Char('b') => {
            EventResult::Dispatch(lock(app_state).next_balance_source_command())
        }
        KeyCode::Char('r') => EventResult::Dispatch(lock(app_state).next_risk_command()),
        KeyCode::Char('t') => EventResult::Dispatch(lock(app_state).toggle_strategy_command()),

        // Editors
        KeyCode::Char('p') => {
            lock(app_state).begin_input(InputTarget::Contracts);
            EventResult::Continue
        }
        KeyCode::Char('o') => {
            lock(app_state).begin_input(InputTarget::OpenSeaKey);
            EventResult::Continue
        }

        // Scroll logs
        KeyCode::Char('k') | KeyCode::Up => scroll(app_state, -1),
        KeyCode::Char('j') | KeyCode::Down => scroll(app_state, 1),
        KeyCode::PageUp => {
            let page = lock(app_state).logs.scroll().viewport().max(1) as isize;
            scroll(app_state, -page)
        }
        KeyCode::PageDown => {
            let page = lock(app_state).logs.scroll().viewport().max(1) as isize;
            scroll(app_state, page)
        }
        KeyCode::Char('G') | KeyCode::End => {
            lock(app_state).logs.scroll_mut().repin();
            EventResult::Continue
        }

        // Toggle INFO/DEBUG forwarding
        KeyCode::Char('l') | KeyCode::Char('L') => {
            let mut state = lock(app_state);
            state.show_debug_logs = !state.show_debug_logs;
            super::logging::set_show_debug(state.show_debug_logs);
            EventResult::Continue
        }

        _ => EventResult::Continue,
    }
}

fn scroll(app_state: &Arc<Mutex<AppState>>, delta: isize) -> EventResult {
    lock(app_state).logs.scroll_mut().scroll_by(delta);
    EventResult::Continue
}

fn process_input_key(code: KeyCode, app_state: &Arc<Mutex<AppState>>) -> EventResult {
    let mut state = lock(app_state);
    match code {
        KeyCode::Enter => match state.submit_input() {
            Some(command) => EventResult::Dispatch(command),
            None => EventResult::Continue,
        },
        KeyCode::Esc => {
            state.cancel_input();
            EventResult::Continue
        }
        KeyCode::Backspace => {
            if let Some(input) = state.input.as_mut() {
                input.buffer.pop();
            }
            EventResult::Continue
        }
        KeyCode::Char(c) => {
            if let Some(input) = state.input.as_mut() {
                input.buffer.push(c);
            }
            EventResult::Continue
        }
        _ => EventResult::Continue,
    }
}

//! Engine Console - Entry Point
//!
//! Orchestrates:
//! 1. Config + logging initialization
//! 2. HTTP client, view model and console session
//! 3. Boot probes, then the poll timers
//! 4. TUI loop (default) or headless log relay (LOG_FORMAT=json|pretty)
//! 5. Graceful shutdown

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::EventStream;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use engine_console::api::HttpApiClient;
use engine_console::config::{self, config_path, init_logging, load_config, LogFormat};
use engine_console::core::format::Severity;
use engine_console::core::Console;
use engine_console::tui::{self, event::handle_events_async, AppState, EventResult, TuiLayer};

/// Headless mode: how often new panel lines are relayed to the subscriber
const RELAY_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // =========================================================================
    // 1. Config + logging
    // =========================================================================
    dotenvy::dotenv().ok();

    let path = config_path();
    let config = load_config(&path)?;
    let format = LogFormat::from_env();

    let state = Arc::new(Mutex::new(AppState::new(
        config.api.base_url.clone(),
        config.logs.capacity,
        config.logs.pin_threshold,
    )));

    match format {
        LogFormat::Tui => {
            tracing_subscriber::registry()
                .with(config::logging::env_filter())
                .with(TuiLayer::new(Arc::clone(&state)))
                .init();
        }
        LogFormat::Json | LogFormat::Pretty => init_logging(),
    }

    info!(
        config = %path.display(),
        api = %config.api.base_url,
        "=== Engine Console ==="
    );

    // =========================================================================
    // 2. Session
    // =========================================================================
    let api = Arc::new(HttpApiClient::new(&config.api)?);
    let console = Arc::new(Console::new(api, Arc::clone(&state), config));

    // =========================================================================
    // 3. Boot, then polling
    // =========================================================================
    let boot_console = Arc::clone(&console);
    let boot_handle = tokio::spawn(async move {
        boot_console.boot().await;
        boot_console.start_polling();
    });

    // =========================================================================
    // 4. Front-end
    // =========================================================================
    let result = match format {
        LogFormat::Tui => run_tui(&console, &state).await,
        LogFormat::Json | LogFormat::Pretty => run_headless(&state).await,
    };

    // =========================================================================
    // 5. Shutdown
    // =========================================================================
    boot_handle.abort();
    console.stop_polling();
    info!("[SHUTDOWN] Clean exit");

    result
}

async fn run_tui(console: &Arc<Console>, state: &Arc<Mutex<AppState>>) -> anyhow::Result<()> {
    let mut terminal = tui::terminal::init()?;
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut events = EventStream::new();

    let outcome: anyhow::Result<()> = async {
        loop {
            {
                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                terminal.draw(|frame| tui::ui::draw(frame, &mut guard))?;
            }

            match handle_events_async(state, &shutdown_tx, &mut events).await {
                EventResult::Continue => {}
                EventResult::Quit => break,
                EventResult::Dispatch(command) => {
                    let console = Arc::clone(console);
                    tokio::spawn(async move { console.dispatch(command).await });
                }
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = tui::terminal::restore(&mut terminal) {
        error!(error = %e, "Failed to restore terminal");
    }
    outcome
}

/// Relays every panel line to the tracing subscriber until Ctrl+C
async fn run_headless(state: &Arc<Mutex<AppState>>) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("[SHUTDOWN] Graceful shutdown initiated"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        signal_token.cancel();
    });

    let mut interval = tokio::time::interval(RELAY_INTERVAL);
    let mut last_seq = 0u64;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                last_seq = relay_new_lines(state, last_seq);
            }
        }
    }
    relay_new_lines(state, last_seq);
    Ok(())
}

fn relay_new_lines(state: &Arc<Mutex<AppState>>, last_seq: u64) -> u64 {
    let guard = state.lock().unwrap_or_else(|e| e.into_inner());
    let mut seq = last_seq;
    for entry in guard.logs.buffer().since(last_seq) {
        match entry.severity {
            Severity::Error => error!(target: "engine", label = %entry.label, "{}", entry.text),
            Severity::Warn => warn!(target: "engine", label = %entry.label, "{}", entry.text),
            Severity::Info | Severity::Success => {
                info!(target: "engine", label = %entry.label, "{}", entry.text)
            }
        }
        seq = entry.seq;
    }
    seq
}

//! Custom tracing Layer for TUI log capture
//!
//! Forwards the console's own tracing events into the log panel. WARN and
//! ERROR always go through; INFO and DEBUG only while toggled on with `l`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::app::AppState;
use crate::core::format::DisplayLogEntry;

/// Whether INFO/DEBUG events are shown. Kept outside AppState so the layer
/// can filter without taking the lock.
static SHOW_DEBUG: AtomicBool = AtomicBool::new(false);

/// Events dropped under lock contention, synced into
/// `AppState.dropped_logs_count` on the next successful lock.
static DROPPED_LOGS: AtomicU64 = AtomicU64::new(0);

/// Update the INFO/DEBUG filter flag (called from event.rs when toggling).
pub fn set_show_debug(enabled: bool) {
    SHOW_DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn show_debug() -> bool {
    SHOW_DEBUG.load(Ordering::Relaxed)
}

/// Layer that mirrors tracing events into the log panel.
///
/// `on_event()` MUST use `try_lock()`, never `lock()`: events can fire while
/// the same thread holds the AppState lock, and `lock()` would deadlock.
/// Dropping a line under contention is acceptable.
pub struct TuiLayer {
    app_state: Arc<Mutex<AppState>>,
}

impl TuiLayer {
    pub fn new(app_state: Arc<Mutex<AppState>>) -> Self {
        Self { app_state }
    }
}

/// WARN and above always; the rest only when toggled on
pub fn passes_filter(level: &Level, show_debug: bool) -> bool {
    *level <= Level::WARN || show_debug
}

impl<S: Subscriber> Layer<S> for TuiLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if !passes_filter(&level, show_debug()) {
            return;
        }

        let entry = DisplayLogEntry::new(level.as_str(), render_event(event));

        let Ok(mut state) = self.app_state.try_lock() else {
            DROPPED_LOGS.fetch_add(1, Ordering::Relaxed);
            return;
        };
        state.dropped_logs_count += DROPPED_LOGS.swap(0, Ordering::Relaxed);
        state.push_log(entry);
    }
}

/// `message [key=value, ...]` for the fields worth showing in the panel
fn render_event(event: &Event<'_>) -> String {
    let mut collector = FieldCollector::default();
    event.record(&mut collector);
    if collector.shown.is_empty() {
        collector.message
    } else {
        format!("{} [{}]", collector.message, collector.shown.join(", "))
    }
}

const SHOWN_FIELDS: [&str; 4] = ["subsystem", "command", "error", "path"];

#[derive(Default)]
struct FieldCollector {
    message: String,
    shown: Vec<String>,
}

impl FieldCollector {
    fn push(&mut self, name: &str, value: String) {
        if name == "message" {
            self.message = value;
        } else if SHOWN_FIELDS.contains(&name) {
            self.shown.push(format!("{}={}", name, value));
        }
    }
}

impl tracing::field::Visit for FieldCollector {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        self.push(field.name(), rendered.trim_matches('"').to_string());
    }
}

//! Engine status state machine
//!
//! Renders the remote engine lifecycle from authoritative snapshots, with an
//! optimistic overlay applied when the user issues start/stop. Any
//! authoritative snapshot replaces the overlay.

use std::time::Instant;

use crate::api::types::{EngineState, EngineStatus, StrategyMode, StrategyStatus, TradeStatus};

/// Separator between meta fragments
pub const META_SEPARATOR: &str = " · ";

/// Progress shown for trade tokens missing from the table
pub const UNKNOWN_TRADE_PERCENT: u16 = 10;

/// Latest engine status, either server-confirmed or a local guess
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSnapshot {
    Confirmed(EngineStatus),
    Optimistic { status: EngineStatus, since: Instant },
}

impl StatusSnapshot {
    pub fn status(&self) -> &EngineStatus {
        match self {
            StatusSnapshot::Confirmed(status) => status,
            StatusSnapshot::Optimistic { status, .. } => status,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        matches!(self, StatusSnapshot::Optimistic { .. })
    }
}

/// Rendered header for the engine panel
#[derive(Debug, Clone, PartialEq)]
pub struct EngineView {
    pub state: EngineState,
    pub label: &'static str,
    pub meta: String,
    pub optimistic: bool,
    pub trade: Option<TradeProgress>,
}

/// Secondary progress indicator driven by the last trade
#[derive(Debug, Clone, PartialEq)]
pub struct TradeProgress {
    pub label: String,
    pub percent: u16,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct EngineMachine {
    snapshot: Option<StatusSnapshot>,
}

impl EngineMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn state(&self) -> EngineState {
        self.snapshot
            .as_ref()
            .map(|s| s.status().state)
            .unwrap_or_default()
    }

    /// Authoritative snapshot: replaces whatever is current
    pub fn apply_confirmed(&mut self, status: EngineStatus) {
        self.snapshot = Some(StatusSnapshot::Confirmed(status));
    }

    /// Start issued: `running` with zero uptime until the server says otherwise
    pub fn optimistic_start(&mut self, now: Instant) {
        let mut status = self.base_status();
        status.state = EngineState::Running;
        status.uptime_seconds = Some(0.0);
        status.heartbeat_ago_seconds = None;
        status.stop_reason = None;
        status.stopped_at = None;
        self.snapshot = Some(StatusSnapshot::Optimistic { status, since: now });
    }

    /// Stop issued: `stopping` until confirmed
    pub fn optimistic_stop(&mut self, now: Instant) {
        let mut status = self.base_status();
        status.state = EngineState::Stopping;
        self.snapshot = Some(StatusSnapshot::Optimistic { status, since: now });
    }

    fn base_status(&self) -> EngineStatus {
        self.snapshot
            .as_ref()
            .map(|s| s.status().clone())
            .unwrap_or_default()
    }

    pub fn view(&self) -> EngineView {
        match &self.snapshot {
            Some(snapshot) => {
                let status = snapshot.status();
                EngineView {
                    state: status.state,
                    label: state_label(status.state),
                    meta: render_meta(status),
                    optimistic: snapshot.is_optimistic(),
                    trade: status.last_trade.as_ref().map(trade_progress),
                }
            }
            None => EngineView {
                state: EngineState::Unknown,
                label: state_label(EngineState::Unknown),
                meta: String::new(),
                optimistic: false,
                trade: None,
            },
        }
    }
}

pub fn state_label(state: EngineState) -> &'static str {
    match state {
        EngineState::Unknown => "Unknown",
        EngineState::Idle => "Idle",
        EngineState::Running => "Running",
        EngineState::Stopping => "Stopping",
    }
}

/// Meta line from the optional fields that are present
pub fn render_meta(status: &EngineStatus) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(uptime) = status.uptime_seconds.and_then(finite_secs) {
        parts.push(format!("uptime {}", format_duration(uptime)));
    }
    if let Some(ago) = status.heartbeat_ago_seconds.and_then(finite_secs) {
        parts.push(format!("heartbeat {} ago", format_duration(ago)));
    }
    if let Some(reason) = non_blank(status.stop_reason.as_deref()) {
        parts.push(format!("stopped: {}", reason));
    }
    if let Some(at) = non_blank(status.stopped_at.as_deref()) {
        parts.push(format!("at {}", at));
    }
    if let Some(trade) = &status.last_trade {
        let (label, _) = trade_phase(&trade.status);
        match non_blank(trade.strategy.as_deref()) {
            Some(strategy) => parts.push(format!("last trade: {} ({})", label, strategy)),
            None => parts.push(format!("last trade: {}", label)),
        }
    }
    if let Some(strategy) = &status.strategy {
        parts.push(strategy_summary(strategy));
    }

    parts.join(META_SEPARATOR)
}

pub fn strategy_summary(strategy: &StrategyStatus) -> String {
    match (strategy.mode, non_blank(strategy.manual.as_deref())) {
        (StrategyMode::Manual, Some(name)) => format!("strategy: manual/{}", name),
        (mode, _) => format!("strategy: {}", mode),
    }
}

/// Fixed label/percent per trade token; unknown tokens keep their raw text
pub fn trade_phase(token: &str) -> (String, u16) {
    let normalized = token.trim().to_lowercase();
    let known = match normalized.as_str() {
        "starting" => Some(("Starting", 5)),
        "idle" => Some(("Idle", 0)),
        "waiting" => Some(("Waiting for signal", 15)),
        "scanning" => Some(("Scanning market", 30)),
        "signal" => Some(("Signal found", 45)),
        "entering" => Some(("Entering position", 60)),
        "filled" => Some(("Filled", 80)),
        "win" => Some(("Closed in profit", 100)),
        "loss" => Some(("Closed at a loss", 100)),
        "skipped" => Some(("Skipped", 100)),
        "error" => Some(("Error", 100)),
        _ => None,
    };
    match known {
        Some((label, percent)) => (label.to_string(), percent),
        None if normalized.is_empty() => ("unknown".to_string(), UNKNOWN_TRADE_PERCENT),
        None => (token.trim().to_string(), UNKNOWN_TRADE_PERCENT),
    }
}

pub fn trade_progress(trade: &TradeStatus) -> TradeProgress {
    let (label, percent) = trade_phase(&trade.status);

    let mut parts: Vec<String> = Vec::new();
    if let Some(strategy) = non_blank(trade.strategy.as_deref()) {
        parts.push(strategy.to_string());
    }
    if let Some(contract) = non_blank(trade.contract.as_deref()) {
        parts.push(short_address(contract));
    }
    if let Some(size) = trade.size_native.filter(|v| v.is_finite()) {
        parts.push(format!("size {:.4}", size));
    }
    if let Some(pnl) = trade.pnl_native.filter(|v| v.is_finite()) {
        parts.push(format!("pnl {:+.4}", pnl));
    }
    if let Some(note) = non_blank(trade.note.as_deref()) {
        parts.push(note.to_string());
    }

    TradeProgress {
        label,
        percent,
        detail: parts.join(META_SEPARATOR),
    }
}

/// `0x1234…abcd` for long hex addresses, verbatim otherwise
pub fn short_address(address: &str) -> String {
    if address.len() > 12 && address.is_ascii() {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// `42s`, `5m03s`, `2h07m`
pub fn format_duration(secs: f64) -> String {
    let total = secs as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}h{:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn finite_secs(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

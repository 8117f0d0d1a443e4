//! Usage tracker
//!
//! Turns quota snapshots into a bounded meter and decides when a snapshot is
//! worth a log line: on any change of the composite value, or once the
//! cooldown has elapsed for an unchanged one.

use std::fmt;
use std::time::{Duration, Instant};

use crate::api::types::UsageSnapshot;

/// Default quiet period for an unchanged value
pub const DEFAULT_USAGE_COOLDOWN: Duration = Duration::from_secs(60);

pub const WARN_PERCENT: f64 = 70.0;
pub const CRITICAL_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterClass {
    Ok,
    Warn,
    Critical,
}

impl fmt::Display for MeterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeterClass::Ok => write!(f, "ok"),
            MeterClass::Warn => write!(f, "warn"),
            MeterClass::Critical => write!(f, "critical"),
        }
    }
}

/// `current / limit` as a percentage clamped to [0, 100]; 0 when undefined
pub fn usage_percent(current: Option<f64>, limit: Option<f64>) -> f64 {
    match (current, limit) {
        (Some(current), Some(limit)) if current.is_finite() && limit.is_finite() && limit > 0.0 => {
            (current / limit * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

pub fn meter_class(percent: f64) -> MeterClass {
    if percent >= CRITICAL_PERCENT {
        MeterClass::Critical
    } else if percent >= WARN_PERCENT {
        MeterClass::Warn
    } else {
        MeterClass::Ok
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageView {
    pub percent: f64,
    pub class: MeterClass,
    pub caption: String,
}

impl UsageView {
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Self {
        let percent = usage_percent(snapshot.current, snapshot.limit);
        Self {
            percent,
            class: meter_class(percent),
            caption: describe(snapshot),
        }
    }
}

/// Human summary: `1200 / 40000 · remaining 38800 · period day · resets 00:00Z`
pub fn describe(snapshot: &UsageSnapshot) -> String {
    let mut parts = vec![format!(
        "{} / {}",
        fmt_amount(snapshot.current),
        fmt_amount(snapshot.limit)
    )];
    if let Some(remaining) = snapshot.remaining.filter(|v| v.is_finite()) {
        parts.push(format!("remaining {}", fmt_amount(Some(remaining))));
    }
    if let Some(period) = snapshot.period.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("period {}", period.trim()));
    }
    if let Some(reset) = snapshot.reset_at.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("resets {}", reset.trim()));
    }
    parts.join(" · ")
}

fn fmt_amount(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => "—".to_string(),
    }
}

/// Fields that make up the "same value" check. `fetched_at` is excluded.
fn composite_key(snapshot: &UsageSnapshot) -> String {
    format!(
        "{:?}|{:?}|{:?}|{:?}|{:?}",
        snapshot.current.map(f64::to_bits),
        snapshot.limit.map(f64::to_bits),
        snapshot.remaining.map(f64::to_bits),
        snapshot.period,
        snapshot.reset_at
    )
}

#[derive(Debug)]
pub struct UsageTracker {
    cooldown: Duration,
    last_key: Option<String>,
    last_emit: Option<Instant>,
}

impl UsageTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_key: None,
            last_emit: None,
        }
    }

    /// Returns the log line to emit for this snapshot, if any
    pub fn observe(&mut self, snapshot: &UsageSnapshot, now: Instant) -> Option<String> {
        let key = composite_key(snapshot);
        let changed = self.last_key.as_deref() != Some(key.as_str());
        let cooled = self
            .last_emit
            .map(|at| now.saturating_duration_since(at) >= self.cooldown)
            .unwrap_or(true);

        if !changed && !cooled {
            return None;
        }

        self.last_key = Some(key);
        self.last_emit = Some(now);
        let percent = usage_percent(snapshot.current, snapshot.limit);
        Some(format!("[USAGE] {} ({:.1}%)", describe(snapshot), percent))
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(DEFAULT_USAGE_COOLDOWN)
    }
}

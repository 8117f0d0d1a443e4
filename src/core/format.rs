//! Log line formatting and severity classification
//!
//! Pure functions turning a raw payload (server log line, command response,
//! local message) into a [`DisplayLogEntry`].
//!
//! Severity is a keyword heuristic: it is best-effort, lossy, and only used
//! to color the panel. Nothing in cursor or buffer logic reads it.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::api::types::LogEntry;

/// Label used when a message carries no `[LABEL]` prefix
pub const DEFAULT_LABEL: &str = "info";

/// Display severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warn,
    Error,
    Success,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
            Severity::Success => write!(f, "success"),
        }
    }
}

/// Rendered log line
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLogEntry {
    /// Local sequence number, assigned by the buffer on append
    pub seq: u64,
    /// Wall-clock time at render, `HH:MM:SS`
    pub time: String,
    pub label: String,
    pub text: String,
    pub severity: Severity,
}

impl DisplayLogEntry {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        let label = label.into();
        let text = text.into();
        let severity = classify_severity(&label, &text);
        // An empty body shows the label instead of a blank line
        let text = if text.is_empty() { label.clone() } else { text };
        Self {
            seq: 0,
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            label,
            text,
            severity,
        }
    }

    /// Free-form message, `[LABEL] text` convention honored
    pub fn from_message(message: &str) -> Self {
        let (label, text) = split_label(message);
        Self::new(label, text)
    }

    /// Any JSON payload (command responses are echoed this way)
    pub fn from_value(value: &Value) -> Self {
        Self::from_message(&format_message(value))
    }

    /// Server log record: structured label/body win over the raw line
    pub fn from_log_entry(entry: &LogEntry) -> Self {
        match &entry.label {
            Some(label) if !label.trim().is_empty() => {
                let text = match &entry.body {
                    Some(body) => format_message(body),
                    None => split_label(&entry.line).1,
                };
                Self::new(label.trim(), text)
            }
            _ => Self::from_message(&entry.line),
        }
    }
}

/// Strings render verbatim, `null` as nothing, everything else as pretty JSON
pub fn format_message(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Optional leading `[2024-01-01 12:00:00Z]` stamp, then `[LABEL] text`
        Regex::new(r"(?s)^\s*(?:\[\d[^\]]*\]\s*)?\[([^\]]+)\]\s*(.*)$").expect("static regex")
    })
}

/// Split `"[LABEL] text"` into its parts; unlabeled messages get `info`.
pub fn split_label(message: &str) -> (String, String) {
    match label_regex().captures(message) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
            caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        ),
        None => (DEFAULT_LABEL.to_string(), message.to_string()),
    }
}

/// Heuristic severity: the label decides first, the body second.
///
/// Label vocabulary: error/fail → error, warn → warn, ok/done/success →
/// success. The body uses the same vocabulary plus `not ready` (error),
/// `delay`/`risk` (warn) and `ready` (success). Default is info.
pub fn classify_severity(label: &str, text: &str) -> Severity {
    if let Some(severity) = classify_label(label) {
        return severity;
    }
    classify_text(text)
}

fn classify_label(label: &str) -> Option<Severity> {
    let lower = label.to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if lower.contains("error") || lower.contains("fail") {
        Some(Severity::Error)
    } else if lower.contains("warn") {
        Some(Severity::Warn)
    } else if lower.contains("ok") || lower.contains("done") || lower.contains("success") {
        Some(Severity::Success)
    } else {
        None
    }
}

fn classify_text(text: &str) -> Severity {
    let lower = text.to_lowercase();
    if lower.contains("error") || lower.contains("fail") || lower.contains("not ready") {
        Severity::Error
    } else if lower.contains("warn") || lower.contains("delay") || lower.contains("risk") {
        Severity::Warn
    } else if lower.contains("ok")
        || lower.contains("done")
        || lower.contains("success")
        || lower.contains("ready")
    {
        Severity::Success
    } else {
        Severity::Info
    }
}

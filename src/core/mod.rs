//! Core module - state reconciliation between the remote engine and the view
//!
//! Leaves first:
//! - `format`: log line formatting and severity heuristic
//! - `logstream`: cursor, bounded buffer, scroll pinning
//! - `engine`: engine status state machine with optimistic overlay
//! - `usage`: quota meter and change-detected logging
//! - `risk`, `overview`: aggregate stats and overview panels
//! - `dispatcher`: user commands and contract list validation
//! - `scheduler`: one restartable timer per subsystem
//! - `session`: the `Console` tying it all together
//!
//! This module uses explicit re-exports instead of glob exports.

pub mod dispatcher;
pub mod engine;
pub mod format;
pub mod logstream;
pub mod overview;
pub mod risk;
pub mod scheduler;
pub mod session;
pub mod usage;

pub use dispatcher::{parse_contracts, Command, CommandKind, Refresh, ValidationError};
pub use engine::{EngineMachine, EngineView, StatusSnapshot, TradeProgress};
pub use format::{classify_severity, DisplayLogEntry, Severity};
pub use logstream::{LogBuffer, LogConsumer, LogCursor, ScrollState};
pub use overview::{KpiGauge, LeaderView, SettingsView, WalletView};
pub use risk::{infer_best_profile, RiskProfile, RiskRow, RiskTable};
pub use scheduler::{PollJob, PollScheduler, Subsystem};
pub use session::{Console, Sequencer};
pub use usage::{usage_percent, MeterClass, UsageTracker, UsageView};

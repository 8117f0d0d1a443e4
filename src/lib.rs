//! Engine Console
//!
//! Terminal console for a remote automated trading engine:
//! - polls engine status, logs, quota usage and aggregate stats
//! - reconciles them into a view model without regressions
//! - issues operator commands with busy/err surfacing

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod tui;

pub use error::AppError;

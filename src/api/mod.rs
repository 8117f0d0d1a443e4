//! Engine API boundary
//!
//! - `client`: the `ConsoleApi` trait and its reqwest implementation
//! - `types`: wire types with lenient decoding
//! - `errors`: `ApiError`

pub mod client;
pub mod errors;
pub mod types;

pub use client::{ConsoleApi, HttpApiClient, Probe};
pub use errors::{ApiError, ApiResult};
pub use types::{
    CommandReply, EngineState, EngineStatus, KpiSnapshot, Leader, LogEntry, RiskProfileStats,
    RiskStatsEnvelope, Settings, StrategyMode, StrategyStatus, TradeStatus, UsageSnapshot,
    WalletSnapshot,
};

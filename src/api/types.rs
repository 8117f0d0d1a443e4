//! Wire types for the engine API
//!
//! Every response is treated as a partial snapshot: optional fields stay
//! `None` when absent, and numeric fields decode leniently (numbers, numeric
//! strings, null) so one odd field does not discard the whole snapshot.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Lenient field decoders
// =============================================================================

/// Number, numeric string or null. Anything else decodes as absent.
///
/// Note that the string `"NaN"` decodes to `f64::NAN`; consumers must check
/// `is_finite()` before ranking on such values.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

/// Non-negative integer variant of [`lenient_f64`]
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64))
}

/// Strings pass through; other non-null values are rendered as compact JSON.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}

/// [`lenient_string`] with an empty-string default
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// Case-insensitive enum token; unparseable values fall back to the default.
pub fn lenient_token<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .map(|v| match v {
            Value::String(s) => Value::String(s.trim().to_lowercase()),
            other => other,
        })
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

// =============================================================================
// Logs
// =============================================================================

/// One server log record. `id` is assigned by the server and increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsEnvelope {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

// =============================================================================
// Engine status
// =============================================================================

/// Remote process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Unknown,
    Idle,
    Running,
    Stopping,
}

/// Strategy selection mode reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyMode {
    #[default]
    Auto,
    Manual,
}

impl std::fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyMode::Auto => write!(f, "auto"),
            StrategyMode::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatus {
    #[serde(default, deserialize_with = "lenient_token")]
    pub mode: StrategyMode,
    #[serde(default, deserialize_with = "lenient_string")]
    pub manual: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StrategyEnvelope {
    #[serde(default)]
    pub strategy: Option<StrategyStatus>,
}

/// Progress of the trade the engine is currently working on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatus {
    /// Raw status token (`scanning`, `filled`, ...); unknown tokens are kept
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub strategy: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub contract: Option<String>,
    #[serde(default, alias = "sizeNative", deserialize_with = "lenient_f64")]
    pub size_native: Option<f64>,
    #[serde(default, alias = "pnlNative", deserialize_with = "lenient_f64")]
    pub pnl_native: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub note: Option<String>,
    #[serde(default, alias = "ts", deserialize_with = "lenient_f64")]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    #[serde(default, deserialize_with = "lenient_token")]
    pub state: EngineState,
    #[serde(default, alias = "uptimeSeconds", alias = "uptime", deserialize_with = "lenient_f64")]
    pub uptime_seconds: Option<f64>,
    #[serde(
        default,
        alias = "heartbeatAgoSeconds",
        alias = "heartbeat_ago",
        deserialize_with = "lenient_f64"
    )]
    pub heartbeat_ago_seconds: Option<f64>,
    #[serde(default, alias = "stopReason", deserialize_with = "lenient_string")]
    pub stop_reason: Option<String>,
    #[serde(default, alias = "stoppedAt", deserialize_with = "lenient_string")]
    pub stopped_at: Option<String>,
    #[serde(default, alias = "lastTrade")]
    pub last_trade: Option<TradeStatus>,
    #[serde(default)]
    pub strategy: Option<StrategyStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub status: Option<EngineStatus>,
}

// =============================================================================
// Usage / quota
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub limit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub remaining: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub period: Option<String>,
    #[serde(default, alias = "resetAt", deserialize_with = "lenient_string")]
    pub reset_at: Option<String>,
    #[serde(default, alias = "fetchedAt", deserialize_with = "lenient_string")]
    pub fetched_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageEnvelope {
    #[serde(default)]
    pub usage: Option<UsageSnapshot>,
}

// =============================================================================
// Risk profile statistics
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskProfileStats {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub trades: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub winrate: Option<f64>,
    #[serde(default, alias = "avgProfit", deserialize_with = "lenient_f64")]
    pub avg_profit: Option<f64>,
    #[serde(default, alias = "totalProfit", deserialize_with = "lenient_f64")]
    pub total_profit: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskStatsEnvelope {
    #[serde(default)]
    pub stats: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub best: Option<String>,
}

impl RiskStatsEnvelope {
    /// Per-profile stats in server order. Entries that are not objects decode
    /// as empty stats so the profile is still rendered with placeholders.
    pub fn profiles(&self) -> Vec<(String, RiskProfileStats)> {
        self.stats
            .iter()
            .map(|(name, value)| {
                let stats = serde_json::from_value::<RiskProfileStats>(value.clone())
                    .unwrap_or_default();
                (name.clone(), stats)
            })
            .collect()
    }
}

// =============================================================================
// Settings / wallet / KPI / leader
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "ADDRESS", default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(rename = "CHAIN", default, deserialize_with = "lenient_string")]
    pub chain: Option<String>,
    #[serde(rename = "MODE", default, deserialize_with = "lenient_string")]
    pub mode: Option<String>,
    #[serde(rename = "RISK_PROFILE", default, deserialize_with = "lenient_string")]
    pub risk_profile: Option<String>,
    #[serde(rename = "OPENSEA_API_KEY", default, deserialize_with = "lenient_string")]
    pub opensea_api_key: Option<String>,
    /// JSON-encoded array of contract addresses
    #[serde(rename = "CONTRACTS", default, deserialize_with = "lenient_string")]
    pub contracts: Option<String>,
    #[serde(rename = "BALANCE_SOURCE", default, deserialize_with = "lenient_string")]
    pub balance_source: Option<String>,
    #[serde(rename = "STRATEGY_MODE", default, deserialize_with = "lenient_string")]
    pub strategy_mode: Option<String>,
    #[serde(rename = "MANUAL_STRATEGY", default, deserialize_with = "lenient_string")]
    pub manual_strategy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsEnvelope {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub balance: Option<f64>,
    /// Older servers report the native balance under `eth`
    #[serde(default, deserialize_with = "lenient_f64")]
    pub eth: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub chain: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub collection_count: Option<u64>,
    #[serde(default)]
    pub collection: Option<Vec<Value>>,
}

impl WalletSnapshot {
    pub fn native_balance(&self) -> Option<f64> {
        self.balance.or(self.eth)
    }

    pub fn collection_size(&self) -> Option<u64> {
        self.collection_count
            .or_else(|| self.collection.as_ref().map(|c| c.len() as u64))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyKpi {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub winrate: Option<f64>,
}

/// Winrate per trading strategy. Extra keys (e.g. `_risk`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    #[serde(default)]
    pub undercut: Option<StrategyKpi>,
    #[serde(default)]
    pub mean_revert: Option<StrategyKpi>,
    #[serde(default)]
    pub momentum: Option<StrategyKpi>,
    #[serde(default)]
    pub hybrid: Option<StrategyKpi>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KpiEnvelope {
    #[serde(default)]
    pub kpi: KpiSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    #[serde(default, deserialize_with = "lenient_string")]
    pub nl: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub best: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderEnvelope {
    #[serde(default)]
    pub leader: Leader,
}

/// Response of `/api/start` and `/api/stop`: the raw body for the log panel,
/// plus the engine status when the server included one.
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub body: Value,
    pub status: Option<EngineStatus>,
}

impl CommandReply {
    pub fn from_body(body: Value) -> Self {
        let status = body
            .get("status")
            .filter(|s| s.is_object())
            .and_then(|s| serde_json::from_value::<EngineStatus>(s.clone()).ok());
        Self { body, status }
    }
}

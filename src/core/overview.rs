//! Overview panels: settings, wallet, strategy KPIs, leader
//!
//! Pure conversions from bundle/settings snapshots to display strings. Missing
//! values render as placeholders, never as `null`.

use crate::api::types::{KpiSnapshot, Leader, Settings, StrategyKpi, WalletSnapshot};
use crate::core::risk::PLACEHOLDER;

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsView {
    pub address: String,
    pub chain: String,
    pub mode: String,
    pub risk_profile: String,
    /// `ready` when an OpenSea key is configured
    pub live: &'static str,
    pub balance_source: String,
    pub strategy: String,
    pub contracts: Vec<String>,
}

impl SettingsView {
    pub fn from_settings(settings: &Settings) -> Self {
        let strategy = match (
            text_or(settings.strategy_mode.as_deref(), "auto"),
            settings.manual_strategy.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        ) {
            (mode, Some(name)) if mode.eq_ignore_ascii_case("manual") => format!("manual/{}", name),
            (mode, _) => mode,
        };

        Self {
            address: text_or(settings.address.as_deref(), PLACEHOLDER),
            chain: text_or(settings.chain.as_deref(), PLACEHOLDER),
            mode: text_or(settings.mode.as_deref(), PLACEHOLDER),
            risk_profile: text_or(settings.risk_profile.as_deref(), PLACEHOLDER),
            live: if has_text(settings.opensea_api_key.as_deref()) {
                "ready"
            } else {
                "not ready"
            },
            balance_source: text_or(settings.balance_source.as_deref(), "auto"),
            strategy,
            contracts: decode_contracts(settings.contracts.as_deref()),
        }
    }
}

impl Default for SettingsView {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// `CONTRACTS` is a JSON-encoded array; anything else is shown as one raw entry
fn decode_contracts(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(items) => items
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Err(_) => vec![raw.to_string()],
    }
}

// =============================================================================
// Wallet
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WalletView {
    pub balance: String,
    pub symbol: String,
    pub usd: String,
    pub source_badge: Option<String>,
    pub chain: Option<String>,
    pub collection: Option<String>,
}

impl WalletView {
    pub fn from_snapshot(wallet: &WalletSnapshot) -> Self {
        let balance = wallet
            .native_balance()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        Self {
            balance: format!("{:.6}", balance),
            symbol: text_or(wallet.symbol.as_deref(), "ETH"),
            usd: wallet
                .usd
                .filter(|v| v.is_finite())
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            source_badge: non_blank(wallet.source.as_deref()).map(|s| format!("src: {}", s)),
            chain: non_blank(wallet.chain.as_deref()).map(str::to_string),
            collection: wallet.collection_size().map(|n| format!("{} NFTs", n)),
        }
    }
}

impl Default for WalletView {
    fn default() -> Self {
        Self::from_snapshot(&WalletSnapshot::default())
    }
}

// =============================================================================
// KPI
// =============================================================================

/// Strategies reported by the KPI endpoint, in display order
pub const STRATEGIES: [&str; 4] = ["undercut", "mean_revert", "momentum", "hybrid"];

#[derive(Debug, Clone, PartialEq)]
pub struct KpiGauge {
    pub name: &'static str,
    /// Winrate in percent, clamped to [0, 100]
    pub winrate: f64,
}

pub fn kpi_gauges(kpi: &KpiSnapshot) -> Vec<KpiGauge> {
    fn gauge(name: &'static str, entry: Option<&StrategyKpi>) -> KpiGauge {
        let winrate = entry
            .and_then(|k| k.winrate)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        KpiGauge { name, winrate }
    }

    vec![
        gauge("undercut", kpi.undercut.as_ref()),
        gauge("mean_revert", kpi.mean_revert.as_ref()),
        gauge("momentum", kpi.momentum.as_ref()),
        gauge("hybrid", kpi.hybrid.as_ref()),
    ]
}

// =============================================================================
// Leader
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderView {
    pub narrative: String,
    pub best: String,
}

impl Default for LeaderView {
    fn default() -> Self {
        Self {
            narrative: String::new(),
            best: PLACEHOLDER.to_string(),
        }
    }
}

impl LeaderView {
    /// The narrative sticks when the server omits it; `best` does not
    pub fn apply(&mut self, leader: &Leader) {
        if let Some(nl) = non_blank(leader.nl.as_deref()) {
            self.narrative = nl.to_string();
        }
        self.best = text_or(leader.best.as_deref(), PLACEHOLDER);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn has_text(value: Option<&str>) -> bool {
    non_blank(value).is_some()
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    non_blank(value).unwrap_or(fallback).to_string()
}

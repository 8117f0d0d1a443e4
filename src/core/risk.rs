//! Risk profile statistics
//!
//! Ranks the per-profile stats and renders the fixed three-row table. Rows
//! always exist, with placeholders when the server has no data for a profile.

use std::fmt;

use crate::api::types::{RiskProfileStats, RiskStatsEnvelope};

pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Conservative,
        RiskProfile::Balanced,
        RiskProfile::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Balanced => "balanced",
            RiskProfile::Aggressive => "aggressive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Next profile in the fixed cycle, used by the selector key
    pub fn next(&self) -> Self {
        match self {
            RiskProfile::Conservative => RiskProfile::Balanced,
            RiskProfile::Balanced => RiskProfile::Aggressive,
            RiskProfile::Aggressive => RiskProfile::Conservative,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => {
                "Lowest risk: smaller positions, higher minimum profit, lower gas cap, fewer quota calls"
            }
            RiskProfile::Balanced => "Balanced: standard limits, medium position size",
            RiskProfile::Aggressive => {
                "Higher risk: larger positions, lower target profit per trade, higher gas cap, faster reactions"
            }
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile with the greatest finite `total_profit`. Ties keep the first seen;
/// missing or non-finite profits never win.
pub fn infer_best_profile(profiles: &[(String, RiskProfileStats)]) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for (name, stats) in profiles {
        let Some(profit) = stats.total_profit.filter(|p| p.is_finite()) else {
            continue;
        };
        match best {
            Some((_, top)) if profit <= top => {}
            _ => best = Some((name.as_str(), profit)),
        }
    }
    best.map(|(name, _)| name.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskRow {
    pub profile: RiskProfile,
    pub trades: String,
    pub winrate: String,
    pub avg_profit: String,
    pub total_profit: String,
    pub is_best: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskTable {
    pub rows: Vec<RiskRow>,
    /// Server-supplied or inferred best profile name
    pub best: Option<String>,
}

impl RiskTable {
    pub fn from_envelope(envelope: &RiskStatsEnvelope) -> Self {
        let profiles = envelope.profiles();
        let best = envelope
            .best
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .or_else(|| infer_best_profile(&profiles));

        let rows = RiskProfile::ALL
            .into_iter()
            .map(|profile| {
                let stats = profiles
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(profile.as_str()))
                    .map(|(_, stats)| stats.clone())
                    .unwrap_or_default();
                RiskRow {
                    profile,
                    trades: stats
                        .trades
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                    winrate: fmt_number(stats.winrate, "%"),
                    avg_profit: fmt_number(stats.avg_profit, ""),
                    total_profit: fmt_number(stats.total_profit, ""),
                    is_best: best
                        .as_deref()
                        .map(|b| b.eq_ignore_ascii_case(profile.as_str()))
                        .unwrap_or(false),
                }
            })
            .collect();

        Self { rows, best }
    }

    /// Table with placeholders only, shown before the first poll
    pub fn empty() -> Self {
        Self::from_envelope(&RiskStatsEnvelope::default())
    }
}

fn fmt_number(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let text = format!("{:.4}", v);
            let text = text.trim_end_matches('0').trim_end_matches('.');
            format!("{}{}", text, suffix)
        }
        _ => PLACEHOLDER.to_string(),
    }
}

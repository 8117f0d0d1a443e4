//! TUI Application State
//!
//! View model shared between the poll tasks, the dispatcher and the renderer.
//! Wrapped in Arc<Mutex<>>; never hold the lock across an `.await`.

use std::collections::HashSet;
use std::time::Instant;

use crate::api::types::{Settings, StrategyMode, StrategyStatus};
use crate::core::dispatcher::{self, Command, CommandKind};
use crate::core::engine::EngineMachine;
use crate::core::format::DisplayLogEntry;
use crate::core::logstream::LogConsumer;
use crate::core::overview::{kpi_gauges, KpiGauge, LeaderView, SettingsView, WalletView, STRATEGIES};
use crate::core::risk::{RiskProfile, RiskTable};
use crate::core::usage::UsageView;

/// Strategy picked when switching to manual with nothing selected before
pub const DEFAULT_MANUAL_STRATEGY: &str = "undercut";

/// Text field currently being edited in the footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Contracts,
    OpenSeaKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputMode {
    pub target: InputTarget,
    pub buffer: String,
}

/// Central application state shared between TUI and poll tasks
#[derive(Debug)]
pub struct AppState {
    pub api_url: String,

    // Engine
    pub engine: EngineMachine,
    pub strategy: Option<StrategyStatus>,

    // Panels
    pub settings_raw: Settings,
    pub settings: SettingsView,
    pub wallet: WalletView,
    pub kpi: Vec<KpiGauge>,
    pub leader: LeaderView,
    pub risk: RiskTable,
    pub usage: Option<UsageView>,

    // Logs
    pub logs: LogConsumer,
    pub dropped_logs_count: u64,

    // Control
    pub busy: HashSet<CommandKind>,
    pub input: Option<InputMode>,
    pub should_quit: bool,
    pub show_debug_logs: bool,
    pub uptime_start: Instant,
}

impl AppState {
    pub fn new(api_url: impl Into<String>, log_capacity: usize, pin_threshold: usize) -> Self {
        Self {
            api_url: api_url.into(),
            engine: EngineMachine::new(),
            strategy: None,
            settings_raw: Settings::default(),
            settings: SettingsView::default(),
            wallet: WalletView::default(),
            kpi: kpi_gauges(&Default::default()),
            leader: LeaderView::default(),
            risk: RiskTable::empty(),
            usage: None,
            logs: LogConsumer::new(log_capacity, pin_threshold),
            dropped_logs_count: 0,
            busy: HashSet::new(),
            input: None,
            should_quit: false,
            show_debug_logs: false,
            uptime_start: Instant::now(),
        }
    }

    /// Append a client-side line to the log panel
    pub fn push_log(&mut self, entry: DisplayLogEntry) -> u64 {
        self.logs.push_local(entry)
    }

    /// `[LABEL] text` convenience over [`push_log`](Self::push_log)
    pub fn push_message(&mut self, message: &str) -> u64 {
        self.push_log(DisplayLogEntry::from_message(message))
    }

    /// Returns false when the control is already busy
    pub fn mark_busy(&mut self, kind: CommandKind) -> bool {
        self.busy.insert(kind)
    }

    pub fn clear_busy(&mut self, kind: CommandKind) {
        self.busy.remove(&kind);
    }

    pub fn is_busy(&self, kind: CommandKind) -> bool {
        self.busy.contains(&kind)
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = SettingsView::from_settings(&settings);
        self.settings_raw = settings;
    }

    pub fn uptime_str(&self) -> String {
        let elapsed = self.uptime_start.elapsed();
        let hours = elapsed.as_secs() / 3600;
        let minutes = (elapsed.as_secs() % 3600) / 60;
        format!("{}h{:02}m", hours, minutes)
    }

    // -------------------------------------------------------------------------
    // Selector cycles
    // -------------------------------------------------------------------------

    pub fn next_mode_command(&self) -> Command {
        let current = self.settings_raw.mode.as_deref().unwrap_or_default();
        Command::SetMode(dispatcher::next_option(&dispatcher::MODES, current).to_string())
    }

    pub fn next_chain_command(&self) -> Command {
        let current = self.settings_raw.chain.as_deref().unwrap_or_default();
        Command::SetChain(dispatcher::next_option(&dispatcher::CHAINS, current).to_string())
    }

    pub fn next_balance_source_command(&self) -> Command {
        let current = self.settings_raw.balance_source.as_deref().unwrap_or("auto");
        Command::SetBalanceSource(
            dispatcher::next_option(&dispatcher::BALANCE_SOURCES, current).to_string(),
        )
    }

    pub fn next_risk_command(&self) -> Command {
        let next = self
            .settings_raw
            .risk_profile
            .as_deref()
            .and_then(RiskProfile::parse)
            .map(|p| p.next())
            .unwrap_or(RiskProfile::Conservative);
        Command::SetRiskProfile(next)
    }

    /// Auto ⇄ manual. Manual keeps the previously chosen strategy, then the
    /// leader's pick, then [`DEFAULT_MANUAL_STRATEGY`].
    pub fn toggle_strategy_command(&self) -> Command {
        let mode = self
            .strategy
            .as_ref()
            .map(|s| s.mode)
            .or_else(|| {
                self.settings_raw
                    .strategy_mode
                    .as_deref()
                    .filter(|m| m.eq_ignore_ascii_case("manual"))
                    .map(|_| StrategyMode::Manual)
            })
            .unwrap_or_default();

        match mode {
            StrategyMode::Manual => Command::SetStrategy {
                mode: StrategyMode::Auto,
                strategy: None,
            },
            StrategyMode::Auto => {
                let leader_best = Some(self.leader.best.as_str())
                    .filter(|b| STRATEGIES.iter().any(|s| s == b));
                let name = self
                    .strategy
                    .as_ref()
                    .and_then(|s| s.manual.as_deref())
                    .or(self.settings_raw.manual_strategy.as_deref())
                    .or(leader_best)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(DEFAULT_MANUAL_STRATEGY);
                Command::SetStrategy {
                    mode: StrategyMode::Manual,
                    strategy: Some(name.trim().to_string()),
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Footer editor
    // -------------------------------------------------------------------------

    pub fn begin_input(&mut self, target: InputTarget) {
        let buffer = match target {
            InputTarget::Contracts => self.settings.contracts.join(", "),
            InputTarget::OpenSeaKey => String::new(),
        };
        self.input = Some(InputMode { target, buffer });
    }

    /// Close the editor and turn its content into a command
    pub fn submit_input(&mut self) -> Option<Command> {
        let input = self.input.take()?;
        Some(match input.target {
            InputTarget::Contracts => Command::PatchContracts(input.buffer),
            InputTarget::OpenSeaKey => Command::SetOpenSeaKey(input.buffer),
        })
    }

    pub fn cancel_input(&mut self) {
        self.input = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new("http://127.0.0.1:8000", 400, 2)
    }

    #[test]
    fn test_app_state_creation() {
        let state = state();
        assert!(state.logs.buffer().is_empty());
        assert!(state.busy.is_empty());
        assert_eq!(state.kpi.len(), 4);
        assert_eq!(state.risk.rows.len(), 3);
        assert!(!state.should_quit);
    }

    #[test]
    fn test_log_rotation() {
        let mut state = AppState::new("http://x", 100, 2);
        for i in 0..150 {
            state.push_message(&format!("[UI] Log {}", i));
        }
        assert_eq!(state.logs.buffer().len(), 100);
        assert_eq!(state.logs.buffer().entries().front().unwrap().text, "Log 50");
    }

    #[test]
    fn test_busy_is_not_reentered() {
        let mut state = state();
        assert!(state.mark_busy(CommandKind::Contracts));
        assert!(!state.mark_busy(CommandKind::Contracts));
        state.clear_busy(CommandKind::Contracts);
        assert!(!state.is_busy(CommandKind::Contracts));
    }

    #[test]
    fn test_selector_cycles_follow_settings() {
        let mut state = state();
        state.apply_settings(Settings {
            mode: Some("paper".into()),
            chain: Some("eth".into()),
            risk_profile: Some("aggressive".into()),
            ..Default::default()
        });
        assert_eq!(state.next_mode_command(), Command::SetMode("live".into()));
        assert_eq!(state.next_chain_command(), Command::SetChain("polygon".into()));
        assert_eq!(
            state.next_balance_source_command(),
            Command::SetBalanceSource("rpc".into())
        );
        assert_eq!(
            state.next_risk_command(),
            Command::SetRiskProfile(RiskProfile::Conservative)
        );
    }

    #[test]
    fn test_strategy_toggle() {
        let mut state = state();
        assert_eq!(
            state.toggle_strategy_command(),
            Command::SetStrategy {
                mode: StrategyMode::Manual,
                strategy: Some(DEFAULT_MANUAL_STRATEGY.into())
            }
        );

        state.leader.best = "momentum".into();
        assert_eq!(
            state.toggle_strategy_command(),
            Command::SetStrategy {
                mode: StrategyMode::Manual,
                strategy: Some("momentum".into())
            }
        );

        state.strategy = Some(StrategyStatus {
            mode: StrategyMode::Manual,
            manual: Some("hybrid".into()),
        });
        assert_eq!(
            state.toggle_strategy_command(),
            Command::SetStrategy {
                mode: StrategyMode::Auto,
                strategy: None
            }
        );
    }

    #[test]
    fn test_input_submit_and_cancel() {
        let mut state = state();
        state.begin_input(InputTarget::OpenSeaKey);
        state.input.as_mut().unwrap().buffer.push_str("abc");
        assert_eq!(state.submit_input(), Some(Command::SetOpenSeaKey("abc".into())));
        assert!(state.input.is_none());

        state.begin_input(InputTarget::Contracts);
        state.cancel_input();
        assert_eq!(state.submit_input(), None);
    }

    #[test]
    fn test_uptime_str_format() {
        let uptime = state().uptime_str();
        assert!(uptime.contains('h'));
        assert!(uptime.contains('m'));
    }
}

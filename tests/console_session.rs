//! Console session integration tests
//!
//! Drives a `Console` against a scripted in-memory engine API:
//! 1. Boot probes and initial fetch
//! 2. Log cursor and dedup against an overlapping server
//! 3. Optimistic start/stop and reconciliation
//! 4. Busy controls, validation, settings refresh
//! 5. Stale responses and usage change detection
//!
//! # Running the tests
//! ```bash
//! cargo test --test console_session
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use engine_console::api::{
    ApiError, ApiResult, CommandReply, ConsoleApi, EngineState, EngineStatus, KpiSnapshot, Leader,
    LogEntry, Probe, RiskStatsEnvelope, Settings, StrategyStatus, UsageSnapshot, WalletSnapshot,
};
use engine_console::config::ConsoleConfig;
use engine_console::core::format::DisplayLogEntry;
use engine_console::core::{Command, Console, RiskProfile, Subsystem};
use engine_console::tui::AppState;

// =============================================================================
// Scripted engine API
// =============================================================================

/// One scripted `/api/status` answer
struct StatusStep {
    delay: Duration,
    state: EngineState,
}

#[derive(Default)]
struct FakeEngine {
    calls: Mutex<Vec<String>>,
    status_script: Mutex<VecDeque<StatusStep>>,
    default_state: Mutex<EngineState>,
    logs: Mutex<Vec<LogEntry>>,
    settings: Mutex<Settings>,
    settings_delays: Mutex<VecDeque<Duration>>,
    usage: Mutex<Option<UsageSnapshot>>,
    start_delay: Mutex<Duration>,
    start_fails: Mutex<bool>,
    start_status: Mutex<Option<EngineStatus>>,
    probe_fails: Mutex<bool>,
    rpc_empty: Mutex<bool>,
}

impl FakeEngine {
    fn new() -> Arc<Self> {
        let engine = Self::default();
        *engine.default_state.lock().unwrap() = EngineState::Idle;
        Arc::new(engine)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn script_status(&self, delay_ms: u64, state: EngineState) {
        self.status_script.lock().unwrap().push_back(StatusStep {
            delay: Duration::from_millis(delay_ms),
            state,
        });
    }

    fn push_log(&self, id: u64, line: &str) {
        self.logs.lock().unwrap().push(LogEntry {
            id,
            line: line.to_string(),
            label: None,
            body: None,
        });
    }
}

fn ok_body() -> Value {
    json!({"ok": true})
}

#[async_trait]
impl ConsoleApi for FakeEngine {
    async fn probe(&self, probe: Probe) -> ApiResult<Value> {
        self.record(probe.path());
        if *self.probe_fails.lock().unwrap() {
            return Err(ApiError::Transport("connection refused".into()));
        }
        Ok(json!({"ok": true, "path": probe.path()}))
    }

    async fn settings(&self) -> ApiResult<Settings> {
        self.record("settings");
        // Answer with what was current when the request arrived
        let snapshot = self.settings.lock().unwrap().clone();
        let delay = self.settings_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn wallet(&self) -> ApiResult<WalletSnapshot> {
        self.record("wallet");
        Ok(WalletSnapshot {
            balance: Some(1.5),
            symbol: Some("ETH".into()),
            ..Default::default()
        })
    }

    async fn kpi(&self) -> ApiResult<KpiSnapshot> {
        self.record("kpi");
        Ok(KpiSnapshot::default())
    }

    async fn leader(&self) -> ApiResult<Leader> {
        self.record("leader");
        Ok(Leader {
            nl: Some("momentum leads this week".into()),
            best: Some("momentum".into()),
        })
    }

    async fn risk_stats(&self) -> ApiResult<RiskStatsEnvelope> {
        self.record("risk");
        Ok(RiskStatsEnvelope::default())
    }

    async fn status(&self) -> ApiResult<Option<EngineStatus>> {
        self.record("status");
        let step = self.status_script.lock().unwrap().pop_front();
        let state = match step {
            Some(step) => {
                tokio::time::sleep(step.delay).await;
                step.state
            }
            None => *self.default_state.lock().unwrap(),
        };
        Ok(Some(EngineStatus {
            state,
            ..Default::default()
        }))
    }

    /// Ignores the cursor on purpose: the console must dedup
    async fn logs_since(&self, _cursor: u64) -> ApiResult<Vec<LogEntry>> {
        self.record("logs");
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn usage(&self) -> ApiResult<Option<UsageSnapshot>> {
        self.record("usage");
        Ok(self.usage.lock().unwrap().clone())
    }

    async fn strategy_status(&self) -> ApiResult<Option<StrategyStatus>> {
        self.record("strategy");
        Ok(None)
    }

    async fn rpc_check(&self) -> ApiResult<Value> {
        self.record("rpc");
        if *self.rpc_empty.lock().unwrap() {
            return Ok(Value::Null);
        }
        Ok(json!({"rpc": "ok", "block": 19000000}))
    }

    async fn start(&self) -> ApiResult<CommandReply> {
        self.record("start");
        let delay = *self.start_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if *self.start_fails.lock().unwrap() {
            return Err(ApiError::Rejected {
                status: 500,
                message: "engine refused to start".into(),
            });
        }
        Ok(CommandReply {
            body: ok_body(),
            status: self.start_status.lock().unwrap().clone(),
        })
    }

    async fn stop(&self) -> ApiResult<CommandReply> {
        self.record("stop");
        Ok(CommandReply {
            body: ok_body(),
            status: None,
        })
    }

    async fn set_mode(&self, mode: &str) -> ApiResult<Value> {
        self.record(format!("mode:{}", mode));
        self.settings.lock().unwrap().mode = Some(mode.to_string());
        Ok(ok_body())
    }

    async fn set_opensea_key(&self, key: &str) -> ApiResult<Value> {
        self.record("opensea");
        self.settings.lock().unwrap().opensea_api_key = Some(key.to_string());
        Ok(ok_body())
    }

    async fn set_chain(&self, chain: &str) -> ApiResult<Value> {
        self.record(format!("chain:{}", chain));
        self.settings.lock().unwrap().chain = Some(chain.to_string());
        Ok(ok_body())
    }

    async fn set_balance_source(&self, source: &str) -> ApiResult<Value> {
        self.record(format!("balance:{}", source));
        Ok(ok_body())
    }

    async fn patch_contracts(&self, contracts: &[String]) -> ApiResult<Value> {
        self.record(format!("contracts:{}", contracts.len()));
        Ok(ok_body())
    }

    async fn set_risk_profile(&self, profile: &str) -> ApiResult<Value> {
        self.record(format!("risk:{}", profile));
        self.settings.lock().unwrap().risk_profile = Some(profile.to_string());
        Ok(ok_body())
    }

    async fn set_strategy(&self, mode: &str, strategy: Option<&str>) -> ApiResult<Value> {
        self.record(format!("strategy:{}:{}", mode, strategy.unwrap_or("-")));
        Ok(ok_body())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn console(engine: &Arc<FakeEngine>) -> Arc<Console> {
    let state = Arc::new(Mutex::new(AppState::new("http://fake", 400, 2)));
    Arc::new(Console::new(
        Arc::clone(engine) as Arc<dyn ConsoleApi>,
        state,
        ConsoleConfig::default(),
    ))
}

fn log_lines(console: &Console) -> Vec<DisplayLogEntry> {
    let state = console.state();
    let state = state.lock().unwrap();
    state.logs.buffer().entries().iter().cloned().collect()
}

fn has_line(console: &Console, label: &str, needle: &str) -> bool {
    log_lines(console)
        .iter()
        .any(|e| e.label == label && e.text.contains(needle))
}

fn engine_state(console: &Console) -> (EngineState, bool) {
    let state = console.state();
    let state = state.lock().unwrap();
    let view = state.engine.view();
    (view.state, view.optimistic)
}

// =============================================================================
// Boot
// =============================================================================

#[tokio::test]
async fn test_boot_probes_then_fetches_everything() {
    let engine = FakeEngine::new();
    engine.push_log(1, "[ENGINE] warming up");
    let console = console(&engine);

    console.boot().await;

    let calls = engine.calls();
    assert_eq!(&calls[..3], &["/api/js-ok", "/api/ping", "/api/test"]);
    for call in ["settings", "wallet", "kpi", "leader", "risk", "strategy", "status", "usage", "logs"] {
        assert!(calls.iter().any(|c| c == call), "missing {}", call);
    }

    assert!(has_line(&console, "UI", "boot"));
    assert!(has_line(&console, "ENGINE", "warming up"));
    assert_eq!(engine_state(&console), (EngineState::Idle, false));

    let state = console.state();
    let state = state.lock().unwrap();
    assert_eq!(state.leader.best, "momentum");
    assert_eq!(state.wallet.balance, "1.500000");
}

#[tokio::test]
async fn test_boot_survives_probe_failures() {
    let engine = FakeEngine::new();
    *engine.probe_fails.lock().unwrap() = true;
    let console = console(&engine);

    console.boot().await;

    assert!(has_line(&console, "BOOT", "/api/ping"));
    // The rest of the boot still ran
    assert!(engine.count("status") >= 1);
}

// =============================================================================
// Logs
// =============================================================================

#[tokio::test]
async fn test_overlapping_log_batches_are_deduplicated() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    engine.push_log(1, "[ENGINE] one");
    engine.push_log(2, "[ENGINE] two");
    console.poll_logs().await;

    engine.push_log(3, "[ENGINE] three");
    console.poll_logs().await;
    console.poll_logs().await;

    let texts: Vec<String> = log_lines(&console)
        .into_iter()
        .filter(|e| e.label == "ENGINE")
        .map(|e| e.text)
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    let state = console.state();
    assert_eq!(state.lock().unwrap().logs.cursor(), 3);
}

// =============================================================================
// Engine control
// =============================================================================

#[tokio::test]
async fn test_start_applies_returned_status() {
    let engine = FakeEngine::new();
    *engine.start_status.lock().unwrap() = Some(EngineStatus {
        state: EngineState::Running,
        uptime_seconds: Some(1.0),
        ..Default::default()
    });
    let console = console(&engine);

    console.dispatch(Command::Start).await;

    assert_eq!(engine_state(&console), (EngineState::Running, false));
    assert!(has_line(&console, "UI", "start"));
    // Status came with the reply, no extra poll
    assert_eq!(engine.count("status"), 0);
    assert!(!console.state().lock().unwrap().busy.contains(&Command::Start.kind()));
}

#[tokio::test]
async fn test_start_without_status_polls_and_reconciles() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    console.dispatch(Command::Start).await;

    // The engine reported idle after all: the optimistic guess is replaced
    assert_eq!(engine.count("status"), 1);
    assert_eq!(engine_state(&console), (EngineState::Idle, false));
}

#[tokio::test(start_paused = true)]
async fn test_optimistic_state_is_visible_while_start_is_in_flight() {
    let engine = FakeEngine::new();
    *engine.start_delay.lock().unwrap() = Duration::from_millis(500);
    *engine.default_state.lock().unwrap() = EngineState::Running;
    let console = console(&engine);

    let task = {
        let console = Arc::clone(&console);
        tokio::spawn(async move { console.dispatch(Command::Start).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(engine_state(&console), (EngineState::Running, true));

    task.await.unwrap();
    assert_eq!(engine_state(&console), (EngineState::Running, false));
}

#[tokio::test]
async fn test_start_failure_logs_error_and_repolls() {
    let engine = FakeEngine::new();
    *engine.start_fails.lock().unwrap() = true;
    let console = console(&engine);

    console.dispatch(Command::Start).await;

    assert!(has_line(&console, "START", "engine refused to start"));
    let calls = engine.calls();
    let start_at = calls.iter().position(|c| c == "start").unwrap();
    assert!(calls[start_at..].iter().any(|c| c == "status"));
    assert_eq!(engine_state(&console), (EngineState::Idle, false));
}

#[tokio::test]
async fn test_stop_goes_optimistic_then_confirms() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    console.dispatch(Command::Stop).await;

    assert_eq!(engine.count("stop"), 1);
    assert_eq!(engine_state(&console), (EngineState::Idle, false));
}

#[tokio::test(start_paused = true)]
async fn test_busy_control_is_not_reentered() {
    let engine = FakeEngine::new();
    *engine.start_delay.lock().unwrap() = Duration::from_millis(300);
    let console = console(&engine);

    let first = {
        let console = Arc::clone(&console);
        tokio::spawn(async move { console.dispatch(Command::Start).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    console.dispatch(Command::Start).await;
    first.await.unwrap();

    assert_eq!(engine.count("start"), 1);
    assert!(has_line(&console, "UI", "start already in progress"));

    // Free again afterwards
    console.dispatch(Command::Start).await;
    assert_eq!(engine.count("start"), 2);
}

// =============================================================================
// Settings commands
// =============================================================================

#[tokio::test]
async fn test_invalid_contracts_send_nothing() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    console
        .dispatch(Command::PatchContracts("0x1234, not-an-address".into()))
        .await;

    assert!(engine.calls().iter().all(|c| !c.starts_with("contracts")));
    assert!(has_line(&console, "PATCH", "Validation error"));
    assert!(!console.state().lock().unwrap().is_busy(Command::PatchContracts(String::new()).kind()));
}

#[tokio::test]
async fn test_valid_contracts_are_patched_and_settings_reloaded() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    let a = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";
    console
        .dispatch(Command::PatchContracts(format!("{} {}", a, a.to_lowercase())))
        .await;

    assert_eq!(engine.count("contracts:1"), 1);
    assert_eq!(engine.count("settings"), 1);
}

#[tokio::test]
async fn test_mode_change_refreshes_settings() {
    let engine = FakeEngine::new();
    let console = console(&engine);
    console.reload_settings().await;

    let command = console.state().lock().unwrap().next_mode_command();
    assert_eq!(command, Command::SetMode("paper".into()));
    console.dispatch(command).await;

    let state = console.state();
    let state = state.lock().unwrap();
    assert_eq!(state.settings.mode, "paper");
    assert_eq!(state.next_mode_command(), Command::SetMode("live".into()));
}

#[tokio::test]
async fn test_risk_profile_and_reload_command() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    console
        .dispatch(Command::SetRiskProfile(RiskProfile::Aggressive))
        .await;
    assert_eq!(engine.count("risk:aggressive"), 1);

    console.dispatch(Command::ReloadSettings).await;
    assert!(has_line(&console, "SETTINGS", "reloaded"));
    assert_eq!(
        console.state().lock().unwrap().settings.risk_profile,
        "aggressive"
    );
}

#[tokio::test]
async fn test_rpc_check_echoes_body() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    console.dispatch(Command::RpcCheck).await;

    assert!(log_lines(&console).iter().any(|e| e.text.contains("19000000")));
}

#[tokio::test]
async fn test_empty_command_reply_is_not_echoed() {
    let engine = FakeEngine::new();
    *engine.rpc_empty.lock().unwrap() = true;
    let console = console(&engine);

    console.dispatch(Command::RpcCheck).await;

    assert_eq!(engine.count("rpc"), 1);
    let lines = log_lines(&console);
    assert!(lines.iter().all(|e| e.text != "null"));
    assert_eq!(lines.len(), 1, "only the intent line: {:?}", lines);
}

// =============================================================================
// Stale responses
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stale_reload_command_is_dropped_without_reloaded_line() {
    let engine = FakeEngine::new();
    engine.settings.lock().unwrap().risk_profile = Some("conservative".into());
    engine
        .settings_delays
        .lock()
        .unwrap()
        .extend([Duration::from_millis(300), Duration::ZERO]);
    let console = console(&engine);

    tokio::join!(console.dispatch(Command::ReloadSettings), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.settings.lock().unwrap().risk_profile = Some("aggressive".into());
        console.reload_settings().await;
    });

    assert_eq!(engine.count("settings"), 2);
    assert_eq!(
        console.state().lock().unwrap().settings.risk_profile,
        "aggressive"
    );
    assert!(!has_line(&console, "SETTINGS", "reloaded"));
}

#[tokio::test(start_paused = true)]
async fn test_settings_command_does_not_invalidate_reload_in_flight() {
    let engine = FakeEngine::new();
    engine.settings.lock().unwrap().chain = Some("polygon".into());
    engine
        .settings_delays
        .lock()
        .unwrap()
        .push_back(Duration::from_millis(100));
    let console = console(&engine);

    tokio::join!(console.reload_settings(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        console.dispatch(Command::RpcCheck).await;
    });

    assert_eq!(console.state().lock().unwrap().settings.chain, "polygon");
}

#[tokio::test(start_paused = true)]
async fn test_slow_older_status_does_not_overwrite_newer() {
    let engine = FakeEngine::new();
    engine.script_status(200, EngineState::Idle);
    engine.script_status(10, EngineState::Running);
    let console = console(&engine);

    tokio::join!(console.poll_status(), console.poll_status());

    assert_eq!(engine_state(&console), (EngineState::Running, false));
}

#[tokio::test(start_paused = true)]
async fn test_poll_in_flight_cannot_undo_optimistic_start() {
    let engine = FakeEngine::new();
    engine.script_status(300, EngineState::Idle);
    engine.script_status(0, EngineState::Running);
    let console = console(&engine);

    tokio::join!(console.poll_status(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        console.dispatch(Command::Start).await;
    });

    assert_eq!(engine_state(&console), (EngineState::Running, false));
}

// =============================================================================
// Usage
// =============================================================================

#[tokio::test]
async fn test_unchanged_usage_is_logged_once() {
    let engine = FakeEngine::new();
    *engine.usage.lock().unwrap() = Some(UsageSnapshot {
        current: Some(750.0),
        limit: Some(1000.0),
        remaining: Some(250.0),
        period: Some("day".into()),
        fetched_at: Some("t1".into()),
        ..Default::default()
    });
    let console = console(&engine);

    console.poll_usage().await;
    engine.usage.lock().unwrap().as_mut().unwrap().fetched_at = Some("t2".into());
    console.poll_usage().await;

    let usage_lines = log_lines(&console)
        .into_iter()
        .filter(|e| e.label == "USAGE")
        .count();
    assert_eq!(usage_lines, 1);

    engine.usage.lock().unwrap().as_mut().unwrap().current = Some(800.0);
    console.poll_usage().await;
    assert!(has_line(&console, "USAGE", "80.0%"));

    let state = console.state();
    let percent = state.lock().unwrap().usage.as_ref().unwrap().percent;
    assert!((percent - 80.0).abs() < 1e-9);
}

// =============================================================================
// Scheduler wiring
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_polling_timers_run_and_stop() {
    let engine = FakeEngine::new();
    let console = console(&engine);

    console.start_polling();
    for subsystem in Subsystem::ALL {
        assert!(console.is_polling(subsystem));
    }

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    // status_ms = 2500: two ticks
    assert_eq!(engine.count("status"), 2);

    console.stop_polling();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.count("status"), 2);
    assert!(!console.is_polling(Subsystem::Status));
}

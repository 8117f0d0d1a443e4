//! Console session
//!
//! `Console` owns everything a running console needs: the API handle, the
//! shared view model, the poll scheduler and the per-subsystem sequencing
//! state. Poll jobs and user commands are methods on it; there are no
//! globals.
//!
//! Every callback follows fetch → lock → validate → apply → unlock. The lock
//! is a std mutex and is never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use futures_util::future::BoxFuture;
use tracing::{debug, info};

use crate::api::client::{ConsoleApi, Probe};
use crate::api::types::EngineStatus;
use crate::config::ConsoleConfig;
use crate::core::dispatcher::{self, Command, CommandKind, Refresh};
use crate::core::format::DisplayLogEntry;
use crate::core::overview::{kpi_gauges, WalletView};
use crate::core::risk::RiskTable;
use crate::core::scheduler::{PollJob, PollScheduler, Subsystem};
use crate::core::usage::{UsageTracker, UsageView};
use crate::tui::app::AppState;

// =============================================================================
// Sequencer
// =============================================================================

/// Request tagging for one snapshot stream.
///
/// A ticket is issued before each request; a response is applied only if its
/// ticket is newer than the last applied one. Responses that lose the race
/// against a later request are dropped instead of overwriting fresher data.
/// `try_apply` must be called under the state lock together with the apply.
#[derive(Debug, Default)]
pub struct Sequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl Sequencer {
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn try_apply(&self, ticket: u64) -> bool {
        let previous = self.applied.fetch_max(ticket, Ordering::SeqCst);
        ticket > previous
    }

    pub fn last_applied(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Sequencers {
    status: Sequencer,
    usage: Sequencer,
    settings: Sequencer,
    wallet: Sequencer,
    kpi: Sequencer,
    leader: Sequencer,
    risk: Sequencer,
    strategy: Sequencer,
}

/// Clears the busy marker of a command however its future ends
struct BusyGuard {
    state: Arc<Mutex<AppState>>,
    kind: CommandKind,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.clear_busy(self.kind);
    }
}

/// What to do once the command's own result has been applied
enum FollowUp {
    Nothing,
    PollStatus,
    ReloadSettings,
}

// =============================================================================
// Console
// =============================================================================

pub struct Console {
    api: Arc<dyn ConsoleApi>,
    state: Arc<Mutex<AppState>>,
    scheduler: PollScheduler,
    config: ConsoleConfig,
    sequencers: Sequencers,
    usage_tracker: Mutex<UsageTracker>,
}

impl Console {
    pub fn new(api: Arc<dyn ConsoleApi>, state: Arc<Mutex<AppState>>, config: ConsoleConfig) -> Self {
        let usage_tracker = Mutex::new(UsageTracker::new(config.usage.cooldown()));
        Self {
            api,
            state,
            scheduler: PollScheduler::new(),
            config,
            sequencers: Sequencers::default(),
            usage_tracker,
        }
    }

    pub fn state(&self) -> Arc<Mutex<AppState>> {
        Arc::clone(&self.state)
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn log(&self, message: &str) {
        self.lock_state().push_message(message);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Probes, then one immediate fetch of every snapshot
    pub async fn boot(&self) {
        self.log("[UI] boot");
        for probe in Probe::ALL {
            match self.api.probe(probe).await {
                Ok(body) if body.is_null() => {}
                Ok(body) => {
                    self.lock_state().push_log(DisplayLogEntry::from_value(&body));
                }
                Err(e) => self.log(&format!("[BOOT][ERR] {} {}", probe.path(), e)),
            }
        }

        self.reload_settings().await;
        tokio::join!(
            self.poll_bundle(),
            self.poll_status(),
            self.poll_usage(),
            self.poll_logs()
        );
        info!(phase = "boot", "Console booted");
    }

    /// Start (or restart) every poll timer
    pub fn start_polling(self: &Arc<Self>) {
        let polling = &self.config.polling;
        let status = self.job(|c| Box::pin(async move { c.poll_status().await }));
        let logs = self.job(|c| Box::pin(async move { c.poll_logs().await }));
        let usage = self.job(|c| Box::pin(async move { c.poll_usage().await }));
        let bundle = self.job(|c| Box::pin(async move { c.poll_bundle().await }));

        self.scheduler.start(Subsystem::Status, polling.status(), status);
        self.scheduler.start(Subsystem::Logs, polling.logs(), logs);
        self.scheduler.start(Subsystem::Usage, polling.usage(), usage);
        self.scheduler.start(Subsystem::Bundle, polling.bundle(), bundle);
        info!(
            status_ms = polling.status_ms,
            logs_ms = polling.logs_ms,
            usage_ms = polling.usage_ms,
            bundle_ms = polling.bundle_ms,
            "Polling started"
        );
    }

    pub fn stop_polling(&self) {
        self.scheduler.stop_all();
        info!("Polling stopped");
    }

    pub fn is_polling(&self, subsystem: Subsystem) -> bool {
        self.scheduler.is_running(subsystem)
    }

    /// Jobs hold a weak handle so the timers never keep the session alive
    fn job<F>(self: &Arc<Self>, run: F) -> PollJob
    where
        F: Fn(Arc<Console>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let weak: Weak<Console> = Arc::downgrade(self);
        Arc::new(move || -> BoxFuture<'static, ()> {
            match weak.upgrade() {
                Some(console) => run(console),
                None => Box::pin(async {}),
            }
        })
    }

    // -------------------------------------------------------------------------
    // Polls
    // -------------------------------------------------------------------------

    pub async fn poll_status(&self) {
        let ticket = self.sequencers.status.issue();
        let result = self.api.status().await;

        let mut state = self.lock_state();
        match result {
            Ok(Some(status)) => {
                if self.sequencers.status.try_apply(ticket) {
                    state.engine.apply_confirmed(status);
                } else {
                    debug!(ticket, "Stale status response discarded");
                }
            }
            Ok(None) => {}
            Err(e) => {
                state.push_message(&format!("[STATUS] fetch failed: {}", e));
            }
        }
    }

    pub async fn poll_logs(&self) {
        let cursor = self.lock_state().logs.cursor();
        let result = self.api.logs_since(cursor).await;

        let mut state = self.lock_state();
        match result {
            Ok(batch) => {
                let applied = state.logs.apply_remote(batch);
                if applied > 0 {
                    debug!(applied, cursor = state.logs.cursor(), "Log batch applied");
                }
            }
            Err(e) => {
                state.push_message(&format!("[LOGS] fetch failed: {}", e));
            }
        }
    }

    pub async fn poll_usage(&self) {
        let ticket = self.sequencers.usage.issue();
        let result = self.api.usage().await;

        let mut state = self.lock_state();
        match result {
            Ok(Some(snapshot)) => {
                if !self.sequencers.usage.try_apply(ticket) {
                    debug!(ticket, "Stale usage response discarded");
                    return;
                }
                state.usage = Some(UsageView::from_snapshot(&snapshot));
                let line = self
                    .usage_tracker
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .observe(&snapshot, Instant::now());
                if let Some(line) = line {
                    state.push_message(&line);
                }
            }
            Ok(None) => {}
            Err(e) => {
                state.push_message(&format!("[USAGE] fetch failed: {}", e));
            }
        }
    }

    /// Wallet, KPI, leader, risk stats and strategy, fetched concurrently and
    /// applied independently
    pub async fn poll_bundle(&self) {
        tokio::join!(
            self.poll_wallet(),
            self.poll_kpi(),
            self.poll_leader(),
            self.poll_risk(),
            self.poll_strategy()
        );
    }

    async fn poll_wallet(&self) {
        let ticket = self.sequencers.wallet.issue();
        let result = self.api.wallet().await;
        let mut state = self.lock_state();
        match result {
            Ok(wallet) if self.sequencers.wallet.try_apply(ticket) => {
                state.wallet = WalletView::from_snapshot(&wallet);
            }
            Ok(_) => {}
            Err(e) => {
                state.push_message(&format!("[WALLET] fetch failed: {}", e));
            }
        }
    }

    async fn poll_kpi(&self) {
        let ticket = self.sequencers.kpi.issue();
        let result = self.api.kpi().await;
        let mut state = self.lock_state();
        match result {
            Ok(kpi) if self.sequencers.kpi.try_apply(ticket) => {
                state.kpi = kpi_gauges(&kpi);
            }
            Ok(_) => {}
            Err(e) => {
                state.push_message(&format!("[KPI] fetch failed: {}", e));
            }
        }
    }

    async fn poll_leader(&self) {
        let ticket = self.sequencers.leader.issue();
        let result = self.api.leader().await;
        let mut state = self.lock_state();
        match result {
            Ok(leader) if self.sequencers.leader.try_apply(ticket) => {
                state.leader.apply(&leader);
            }
            Ok(_) => {}
            Err(e) => {
                state.push_message(&format!("[LEADER] fetch failed: {}", e));
            }
        }
    }

    async fn poll_risk(&self) {
        let ticket = self.sequencers.risk.issue();
        let result = self.api.risk_stats().await;
        let mut state = self.lock_state();
        match result {
            Ok(envelope) if self.sequencers.risk.try_apply(ticket) => {
                state.risk = RiskTable::from_envelope(&envelope);
            }
            Ok(_) => {}
            Err(e) => {
                state.push_message(&format!("[RISK] fetch failed: {}", e));
            }
        }
    }

    async fn poll_strategy(&self) {
        let ticket = self.sequencers.strategy.issue();
        let result = self.api.strategy_status().await;
        let mut state = self.lock_state();
        match result {
            Ok(Some(strategy)) if self.sequencers.strategy.try_apply(ticket) => {
                state.strategy = Some(strategy);
            }
            Ok(_) => {}
            Err(e) => {
                state.push_message(&format!("[STRATEGY] fetch failed: {}", e));
            }
        }
    }

    pub async fn reload_settings(&self) {
        let ticket = self.sequencers.settings.issue();
        let result = self.api.settings().await;
        let mut state = self.lock_state();
        match result {
            Ok(settings) if self.sequencers.settings.try_apply(ticket) => {
                state.apply_settings(settings);
            }
            Ok(_) => {}
            Err(e) => {
                state.push_message(&format!("[SETTINGS] fetch failed: {}", e));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Run a user command: intent → busy → call → log → refresh → not busy.
    ///
    /// Failures end up in the log panel; nothing is propagated.
    pub async fn dispatch(&self, command: Command) {
        let kind = command.kind();
        {
            let mut state = self.lock_state();
            if !state.mark_busy(kind) {
                state.push_message(&format!(
                    "[UI] {} already in progress",
                    command.name().to_lowercase()
                ));
                return;
            }
            state.push_message(&command.intent());

            match command {
                Command::Start => {
                    self.claim_status_slot();
                    state.engine.optimistic_start(Instant::now());
                }
                Command::Stop => {
                    self.claim_status_slot();
                    state.engine.optimistic_stop(Instant::now());
                }
                _ => {}
            }
        }
        let busy = BusyGuard {
            state: Arc::clone(&self.state),
            kind,
        };

        let status_ticket =
            (command.refresh() == Refresh::Status).then(|| self.sequencers.status.issue());
        let settings_ticket =
            matches!(command, Command::ReloadSettings).then(|| self.sequencers.settings.issue());
        let result = dispatcher::execute(self.api.as_ref(), &command).await;

        let follow_up = {
            let mut state = self.lock_state();
            match result {
                Ok(output) => {
                    // An empty reply has nothing worth echoing
                    if let Some(body) = output.body.as_ref().filter(|b| !b.is_null()) {
                        state.push_log(DisplayLogEntry::from_value(body));
                    }
                    if let Some(settings) = output.settings {
                        let fresh =
                            settings_ticket.is_some_and(|t| self.sequencers.settings.try_apply(t));
                        if fresh {
                            state.apply_settings(settings);
                            state.push_message("[SETTINGS] reloaded");
                        } else {
                            debug!("Stale settings reload discarded");
                        }
                    }
                    match command.refresh() {
                        Refresh::Status => match (output.status, status_ticket) {
                            (Some(status), Some(ticket)) => {
                                self.apply_status(&mut state, ticket, status);
                                FollowUp::Nothing
                            }
                            _ => FollowUp::PollStatus,
                        },
                        Refresh::Settings => FollowUp::ReloadSettings,
                        Refresh::None => FollowUp::Nothing,
                    }
                }
                Err(e) => {
                    debug!(command = command.name(), error = %e, "Command failed");
                    state.push_message(&format!("[{}][ERR] {}", command.name(), e));
                    // The optimistic guess is not trusted after a failure
                    if command.refresh() == Refresh::Status {
                        FollowUp::PollStatus
                    } else {
                        FollowUp::Nothing
                    }
                }
            }
        };
        drop(busy);

        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::PollStatus => self.poll_status().await,
            FollowUp::ReloadSettings => self.reload_settings().await,
        }
    }

    /// Optimistic updates count as applied, so polls already in flight
    /// cannot roll them back
    fn claim_status_slot(&self) {
        let ticket = self.sequencers.status.issue();
        self.sequencers.status.try_apply(ticket);
    }

    fn apply_status(&self, state: &mut AppState, ticket: u64, status: EngineStatus) {
        if self.sequencers.status.try_apply(ticket) {
            state.engine.apply_confirmed(status);
        } else {
            debug!(ticket, "Stale command status discarded");
        }
    }
}

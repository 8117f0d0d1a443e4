//! Poll scheduler
//!
//! One repeating timer per subsystem. Each tick spawns its job as a detached
//! task, so a slow job never delays the next tick or another subsystem, and
//! stopping a timer never cancels a request already in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Independently scheduled poll groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Status,
    Logs,
    Usage,
    /// Wallet, KPI, leader and risk stats
    Bundle,
}

impl Subsystem {
    pub const ALL: [Subsystem; 4] = [
        Subsystem::Status,
        Subsystem::Logs,
        Subsystem::Usage,
        Subsystem::Bundle,
    ];
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Status => write!(f, "status"),
            Subsystem::Logs => write!(f, "logs"),
            Subsystem::Usage => write!(f, "usage"),
            Subsystem::Bundle => write!(f, "bundle"),
        }
    }
}

/// Factory for one poll; called on every tick
pub type PollJob = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
pub struct PollScheduler {
    timers: Mutex<HashMap<Subsystem, JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the timer of `subsystem`. A running timer is cleared first,
    /// so repeated starts never stack loops. First tick after one `period`.
    pub fn start(&self, subsystem: Subsystem, period: Duration, job: PollJob) {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tokio::spawn(job());
            }
        });

        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = timers.insert(subsystem, handle) {
            previous.abort();
            debug!(subsystem = %subsystem, "Poll timer restarted");
        } else {
            debug!(subsystem = %subsystem, period_ms = period.as_millis() as u64, "Poll timer started");
        }
    }

    /// Clear the timer; returns whether one was running
    pub fn stop(&self, subsystem: Subsystem) -> bool {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        match timers.remove(&subsystem) {
            Some(handle) => {
                handle.abort();
                debug!(subsystem = %subsystem, "Poll timer stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    pub fn is_running(&self, subsystem: Subsystem) -> bool {
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers
            .get(&subsystem)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

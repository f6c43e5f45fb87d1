//! Report scheduling. A minute-resolution clock loop fires the configured
//! daily runs; on-demand triggers share the same entry point. One run at a
//! time, and at most one run per wall-clock minute.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::report::ReportEngine;

/// Immediate answer to a trigger request; the run itself happens on a
/// blocking worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// A run already fired in this wall-clock minute.
    Duplicate,
    /// A run is still in progress.
    Busy,
}

pub struct ReportScheduler {
    engine: Arc<ReportEngine>,
    fire_times: Vec<NaiveTime>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    last_run_minute: AtomicI64,
    shutdown: AtomicBool,
}

const TICK: Duration = Duration::from_secs(20);

impl ReportScheduler {
    pub fn new(engine: Arc<ReportEngine>, fire_times: Vec<NaiveTime>) -> Self {
        Self {
            engine,
            fire_times,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            last_run_minute: AtomicI64::new(i64::MIN),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Request a report run now. Returns without waiting for the run.
    pub fn trigger(&self) -> TriggerOutcome {
        let minute = chrono::Utc::now().timestamp() / 60;
        self.trigger_with_key(minute)
    }

    fn trigger_with_key(&self, minute: i64) -> TriggerOutcome {
        if self.last_run_minute.load(Ordering::SeqCst) == minute {
            return TriggerOutcome::Duplicate;
        }
        let guard = match Arc::clone(&self.run_lock).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => return TriggerOutcome::Busy,
        };
        self.last_run_minute.store(minute, Ordering::SeqCst);

        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            let _running = guard;
            match engine.run() {
                Ok(outcome) => {
                    tracing::info!(
                        rows = outcome.rows,
                        delivered = outcome.delivered,
                        "scheduled report run finished"
                    );
                }
                Err(err) => {
                    tracing::error!(error = %err, "scheduled report run failed");
                }
            }
        });
        TriggerOutcome::Started
    }

    fn is_fire_time(&self, now: NaiveTime) -> bool {
        self.fire_times
            .iter()
            .any(|t| t.hour() == now.hour() && t.minute() == now.minute())
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Clock loop. Ticks well under a minute so no fire minute is skipped;
    /// the per-minute dedupe absorbs the extra ticks.
    pub async fn run_forever(self: Arc<Self>) {
        tracing::info!(times = ?self.fire_times, "report scheduler started");
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let now = chrono::Local::now().time();
            if self.is_fire_time(now) {
                let outcome = self.trigger();
                tracing::debug!(?outcome, "scheduled fire");
            }
            tokio::time::sleep(TICK).await;
        }
        tracing::info!("report scheduler stopped");
    }
}

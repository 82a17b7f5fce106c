//! Periodic focus-check loop.
//!
//! One tokio task ticks at the configured interval. Each cycle runs to completion
//! inside the loop body; cancellation is only observed between ticks, so `stop`
//! never interrupts a classification or a metrics write. `check_now` shares the
//! cycle lock with the loop, which keeps cycles from overlapping.

mod state;

pub use state::{
    log_line, CycleReport, MonitorState, MonitorStatus, ACTIVITY_LOG_LINES, ALERT_THRESHOLD,
};

use std::sync::{Arc, RwLock};

use anyhow::Context;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::activity::ActivitySource;
use crate::agent::{Evaluation, FocusAgent};
use crate::db::models::Verdict;
use crate::error::{FocusError, FocusResult};
use crate::metrics::MetricsTracker;
use crate::tasks::TaskStore;
use crate::voice::SpeechSink;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const SPEECH_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything one cycle needs, shared between the loop task and `check_now`.
struct MonitorCore {
    store: TaskStore,
    agent: FocusAgent,
    metrics: MetricsTracker,
    speech: Arc<dyn SpeechSink>,
    /// Held for the whole cycle; also owns the activity source.
    cycle: Mutex<Box<dyn ActivitySource>>,
    state: RwLock<MonitorState>,
}

impl MonitorCore {
    async fn run_cycle(&self) -> FocusResult<CycleReport> {
        let mut source = self.cycle.lock().await;

        let task = self.store.get_active().await?;
        let snapshot = match source.capture().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log_warn!("activity capture failed, treating as no activity: {err}");
                None
            }
        };

        let evaluation = self.agent.evaluate(task.as_ref(), snapshot.as_ref()).await;
        let check = self
            .metrics
            .record(evaluation.verdict, task.as_ref(), &evaluation.message)
            .await?;

        let should_alert = self.write_state(|state| state.apply(&evaluation, check.timestamp));
        log_info!(
            "{} (backend={}, degraded={})",
            log_line(evaluation.verdict, &evaluation.message),
            evaluation.backend,
            evaluation.degraded
        );
        if should_alert {
            log_warn!("{ALERT_THRESHOLD}+ unfocused checks in a row");
        }

        self.speak(&evaluation);
        drop(source);

        Ok(CycleReport {
            check,
            evaluation,
            should_alert,
        })
    }

    /// Fire-and-forget; the cycle does not wait for speech.
    fn speak(&self, evaluation: &Evaluation) {
        if evaluation.verdict == Verdict::OnTrack {
            return;
        }
        let speech = Arc::clone(&self.speech);
        let verdict = evaluation.verdict;
        let message = evaluation.message.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(SPEECH_TIMEOUT, speech.speak(verdict, &message)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log_warn!("speech failed: {err:?}"),
                Err(_) => log_warn!("speech timed out (> {}s)", SPEECH_TIMEOUT.as_secs()),
            }
        });
    }

    fn read_state<T>(&self, f: impl FnOnce(&MonitorState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    fn write_state<T>(&self, f: impl FnOnce(&mut MonitorState) -> T) -> T {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

pub struct FocusMonitor {
    core: Arc<MonitorCore>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    interval: Option<Duration>,
}

impl FocusMonitor {
    pub fn new(
        store: TaskStore,
        agent: FocusAgent,
        metrics: MetricsTracker,
        source: Box<dyn ActivitySource>,
        speech: Arc<dyn SpeechSink>,
    ) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                store,
                agent,
                metrics,
                speech,
                cycle: Mutex::new(source),
                state: RwLock::new(MonitorState::default()),
            }),
            handle: None,
            cancel_token: None,
            interval: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The first cycle runs immediately.
    pub fn start(&mut self, interval: Duration) -> FocusResult<()> {
        if self.handle.is_some() {
            return Err(FocusError::configuration("monitor already running"));
        }
        if interval.is_zero() {
            return Err(FocusError::validation(
                "interval",
                "check interval must be at least one second",
            ));
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            Arc::clone(&self.core),
            interval,
            cancel_token.clone(),
        ));

        log_info!("monitor started (every {}s)", interval.as_secs());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.interval = Some(interval);
        Ok(())
    }

    /// Waits for an in-flight cycle to finish. A stopped monitor can be started again.
    pub async fn stop(&mut self) -> FocusResult<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.interval = None;

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map_err(FocusError::Storage)?;
        }
        Ok(())
    }

    /// Runs one cycle now, after any cycle already in progress.
    pub async fn check_now(&self) -> FocusResult<CycleReport> {
        self.core.run_cycle().await
    }

    pub fn status(&self) -> MonitorStatus {
        let running = self.is_running();
        let interval = self.interval.filter(|_| running).map(|i| i.as_secs());
        self.core.read_state(|state| state.snapshot(running, interval))
    }

    /// Stops the loop and releases the activity source.
    pub async fn shutdown(&mut self) -> FocusResult<()> {
        self.stop().await?;
        self.core.cycle.lock().await.close();
        Ok(())
    }
}

async fn monitor_loop(core: Arc<MonitorCore>, interval: Duration, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = core.run_cycle().await {
                    log_error!("focus check failed [{}]: {err}", err.code());
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("monitor loop shutting down");
                break;
            }
        }
    }
}

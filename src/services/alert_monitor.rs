use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    sync::{watch, Mutex as AsyncMutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::errors::PassError;

use super::alert_evaluator::{AlertEvaluator, PassReport};

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct MonitorInner {
    evaluator: AlertEvaluator,
    interval: Duration,
    // held for the duration of a pass; passes never overlap
    pass_guard: AsyncMutex<()>,
    worker: Mutex<Option<Worker>>,
}

/// Owns the periodic alert check.
///
/// `start` spawns the timer loop, `stop` signals it and waits for an in-flight
/// pass to finish, and `run_once` runs a pass on demand. Timer ticks that land
/// while a pass is running are skipped; `run_once` queues behind it instead.
#[derive(Clone)]
pub struct AlertMonitor {
    inner: Arc<MonitorInner>,
}

impl AlertMonitor {
    pub fn new(evaluator: AlertEvaluator, interval: Duration) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                evaluator,
                interval,
                pass_guard: AsyncMutex::new(()),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker().is_some()
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.inner.worker.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts the timer loop. The first pass runs one interval from now.
    /// Calling `start` on a running monitor does nothing.
    pub fn start(&self) {
        let mut worker = self.worker();
        if worker.is_some() {
            return;
        }

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(self.inner.clone(), rx));
        *worker = Some(Worker { shutdown, handle });

        tracing::info!(interval_secs = self.inner.interval.as_secs(), "alert monitor started");
    }

    /// Stops the timer loop, letting an in-flight pass complete.
    pub async fn stop(&self) {
        let worker = self.worker().take();
        let Some(worker) = worker else {
            return;
        };

        let _ = worker.shutdown.send(true);
        if let Err(e) = worker.handle.await {
            tracing::error!(error = %e, "alert monitor task ended abnormally");
        }

        tracing::info!("alert monitor stopped");
    }

    /// Runs one full pass now, waiting for a running pass to finish first.
    pub async fn run_once(&self) -> Result<PassReport, PassError> {
        let _guard = self.inner.pass_guard.lock().await;
        self.inner.evaluator.run_pass().await
    }
}

impl MonitorInner {
    async fn tick(&self) {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            tracing::warn!("previous alert pass still running; skipping tick");
            return;
        };

        if let Err(e) = self.evaluator.run_pass().await {
            tracing::error!(error = %e, "alert pass failed");
        }
    }
}

async fn run_loop(inner: Arc<MonitorInner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval_at(Instant::now() + inner.interval, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => inner.tick().await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

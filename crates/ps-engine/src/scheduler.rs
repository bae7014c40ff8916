//! Refresh scheduler
//!
//! Two cadences run as separate tasks and never share a loop:
//!
//! - slow: a timer task raises a [`RefreshSignal`]; a consumer task runs
//!   `refresh_from_source` for each pending request. The signal holds at
//!   most one pending request, so ticks that fire while a refresh is still
//!   queued are dropped instead of piling up.
//! - fast: every tick runs `retest_and_publish`. The first tick fires at
//!   startup, which also seeds "all" through the updater.
//!
//! Every wait selects on the shutdown token; an in-flight run is abandoned
//! when the token is cancelled.

use crate::updater::DescriptorUpdater;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_RETEST_INTERVAL: Duration = Duration::from_secs(5);

/// Raises refresh requests; at most one can be pending
#[derive(Clone)]
pub struct RefreshSignal {
    tx: mpsc::Sender<()>,
}

/// Consumes refresh requests
pub struct RefreshRequests {
    rx: mpsc::Receiver<()>,
}

/// Create a single-slot refresh signal
pub fn refresh_signal() -> (RefreshSignal, RefreshRequests) {
    let (tx, rx) = mpsc::channel(1);
    (RefreshSignal { tx }, RefreshRequests { rx })
}

impl RefreshSignal {
    /// Request a refresh without waiting. Returns false if one is already
    /// pending (or the consumer is gone) and this request was dropped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Closed(())) => false,
        }
    }
}

impl RefreshRequests {
    /// Wait for the next request; None once every signal is dropped
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub refresh_interval: Duration,
    pub retest_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            retest_interval: DEFAULT_RETEST_INTERVAL,
        }
    }
}

pub struct Scheduler {
    updater: Arc<DescriptorUpdater>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(updater: Arc<DescriptorUpdater>, config: SchedulerConfig) -> Self {
        Self { updater, config }
    }

    /// Start both cadences. They run until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> SchedulerHandle {
        let (signal, requests) = refresh_signal();

        info!(
            "Starting scheduler: refresh every {:?}, retest every {:?}",
            self.config.refresh_interval, self.config.retest_interval
        );

        let tasks = vec![
            tokio::spawn(refresh_timer(
                signal,
                self.config.refresh_interval,
                shutdown.clone(),
            )),
            tokio::spawn(refresh_loop(
                self.updater.clone(),
                requests,
                shutdown.clone(),
            )),
            tokio::spawn(retest_loop(
                self.updater,
                self.config.retest_interval,
                shutdown,
            )),
        ];

        SchedulerHandle { tasks }
    }
}

pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Wait up to `grace` for the cadence tasks to exit, aborting whatever
    /// is left after that. Returns true if every task exited on its own.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let aborts: Vec<_> = self.tasks.iter().map(|t| t.abort_handle()).collect();

        match tokio::time::timeout(grace, join_all(self.tasks)).await {
            Ok(_) => {
                info!("Scheduler stopped");
                true
            }
            Err(_) => {
                warn!("Scheduler did not stop within {:?}, aborting", grace);
                for abort in aborts {
                    abort.abort();
                }
                false
            }
        }
    }
}

async fn refresh_timer(signal: RefreshSignal, period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if !signal.request() {
                    debug!("Refresh already pending, tick dropped");
                }
            }
        }
    }
}

async fn refresh_loop(
    updater: Arc<DescriptorUpdater>,
    mut requests: RefreshRequests,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            request = requests.next() => {
                if request.is_none() {
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            result = updater.refresh_from_source() => {
                if let Err(e) = result {
                    error!("Refresh from source failed, keeping cached descriptors: {}", e);
                }
            }
        }
    }
}

async fn retest_loop(updater: Arc<DescriptorUpdater>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            result = updater.retest_and_publish() => {
                if let Err(e) = result {
                    error!("Retest failed, keeping published descriptors: {}", e);
                }
            }
        }
    }
}

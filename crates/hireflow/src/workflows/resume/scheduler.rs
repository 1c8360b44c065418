use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::monitor::{SlaMonitor, SweepError};
use super::repository::{Directory, NotificationSink, ResumeRepository};

/// Running SLA monitor task.
pub struct SlaMonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SlaMonitorHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop ticking and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "SLA monitor task ended abnormally");
        }
    }
}

/// Run sweeps every `monitor.config().interval` until the handle is shut down. The first
/// sweep fires one interval after start.
pub fn spawn_sla_monitor<R, D, N>(monitor: Arc<SlaMonitor<R, D, N>>) -> SlaMonitorHandle
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_monitor_loop(monitor, cancel.clone()));
    SlaMonitorHandle { cancel, task }
}

async fn run_monitor_loop<R, D, N>(monitor: Arc<SlaMonitor<R, D, N>>, cancel: CancellationToken)
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let period = monitor.config().interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_secs = period.as_secs(),
        lookahead_hours = monitor.config().lookahead.num_hours(),
        "SLA monitor started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("SLA monitor shutting down");
                break;
            }
            _ = ticker.tick() => {
                let worker = Arc::clone(&monitor);
                match tokio::task::spawn_blocking(move || worker.sweep()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(SweepError::AlreadyRunning)) => {
                        debug!("previous SLA sweep still running; skipping tick");
                    }
                    Ok(Err(err)) => error!(error = %err, "SLA sweep aborted; retrying next tick"),
                    Err(err) => error!(error = %err, "SLA sweep task panicked"),
                }
            }
        }
    }
}

//! Periodic jobs: fleet housekeeping on a fixed interval and signature
//! renewal every day at 00:00 UTC.
//!
//! Jobs run inline in one task, so a slow housekeeping run delays the next
//! tick instead of overlapping it. Every mutation still goes through the
//! store's global lock, which also serializes jobs against API requests.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::ServiceState;

/// Spawn the scheduler; it stops once `shutdown_rx` fires. A job that is
/// already running finishes first.
pub fn spawn(state: ServiceState, shutdown_rx: watch::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(run(state, shutdown_rx))
}

async fn run(state: ServiceState, mut shutdown_rx: watch::Receiver<()>) {
    let period = Duration::from_secs(state.config().housekeeping_interval_s);
    let resign_enabled = state.config().resign_enabled;
    let mut housekeeping = interval_at(Instant::now() + period, period);
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(
        interval_s = period.as_secs(),
        resign_enabled,
        "scheduler started"
    );

    loop {
        let resign_in = until_next_midnight(Utc::now());
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = housekeeping.tick() => run_housekeeping(&state).await,
            _ = sleep(resign_in), if resign_enabled => run_resign(&state).await,
        }
    }
    tracing::info!("scheduler stopped");
}

async fn run_housekeeping(state: &ServiceState) {
    match state.housekeeper().run_all().await {
        Ok(report) if report.failed.is_empty() => {
            tracing::debug!(cleaned = report.cleaned(), "scheduled housekeeping completed")
        }
        Ok(report) => tracing::warn!(
            failed = report.failed.len(),
            "scheduled housekeeping completed with failures"
        ),
        Err(e) => tracing::error!(error = %e, "scheduled housekeeping failed"),
    }
}

async fn run_resign(state: &ServiceState) {
    match state.housekeeper().resign().await {
        Ok(()) => tracing::info!("scheduled re-signing completed"),
        Err(e) => tracing::error!(error = %e, "scheduled re-signing failed"),
    }
}

/// Time from `now` until the next 00:00 UTC. Never shorter than one
/// second, so a timer that fires a hair early does not run the job twice.
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let after = now + TimeDelta::seconds(1);
    let next_midnight = after
        .date_naive()
        .succ_opt()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc());
    match next_midnight {
        Some(midnight) => (midnight - now).to_std().unwrap_or(Duration::from_secs(1)),
        None => Duration::from_secs(24 * 60 * 60),
    }
}

//! Acquisition loop: fetch, persist, prune, sleep.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::source::PositionSource;
use crate::store::PositionStore;

/// Long-lived loop driving one fetch/persist/prune cycle per tick until
/// the shutdown flag flips.
///
/// A single failure never stops the loop: fetch and storage errors are
/// logged and the next tick proceeds. Pruning runs here, after the insert,
/// rather than on its own timer, so this task stays the only writer.
/// Cancellation is cooperative; the flag is checked between ticks, so an
/// in-flight fetch completes (or times out) before the loop exits.
pub async fn acquisition_task(
    source: PositionSource,
    store: Arc<PositionStore>,
    fetch_interval: Duration,
    retention_days: i64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(fetch_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        interval_secs = fetch_interval.as_secs(),
        retention_days, "acquisition loop started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_cycle(&source, &store, retention_days).await;
            }
            _ = shutdown.changed() => {
                info!("acquisition loop stopping");
                break;
            }
        }
    }
}

async fn run_cycle(source: &PositionSource, store: &PositionStore, retention_days: i64) {
    let obs = match source.fetch().await {
        Ok(obs) => obs,
        Err(e) => {
            warn!(error = %e, "fetch failed, skipping this tick");
            return;
        }
    };

    let id = match store.insert(&obs).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "failed to persist sample");
            return;
        }
    };

    info!(
        id,
        latitude = obs.latitude,
        longitude = obs.longitude,
        observed_at = %obs.observed_at,
        "stored position sample"
    );

    let cutoff = Utc::now() - chrono::Duration::days(retention_days);
    match store.delete_older_than(cutoff).await {
        Ok(0) => {}
        Ok(deleted) => info!(deleted, "pruned samples past retention window"),
        Err(e) => error!(error = %e, "retention prune failed"),
    }
}

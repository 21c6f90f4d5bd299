use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::monitoring::metrics::{log_metrics_snapshot, METRICS};

/// Spawn a background task that periodically logs a compact metrics snapshot.
///
/// Combined with the JSON log output this gives a simple terminal dashboard
/// (`jq 'select(.target == "metrics")'`). The handle can be aborted on shutdown.
pub fn spawn_dashboard_task(period: Duration) -> JoinHandle<()> {
    let mut ticker = interval(period);
    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            let snapshot = METRICS.snapshot();
            log_metrics_snapshot(&snapshot);
        }
    })
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::info;

/// Global metrics registry shared by the slip, sync and placement layers.
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::default);

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[derive(Default)]
struct MetricsInner {
    bets_added: AtomicU64,
    bets_removed: AtomicU64,
    mirror_writes: AtomicU64,
    mirror_failures: AtomicU64,
    placements: AtomicU64,
    placement_failures: AtomicU64,
    last_event_ts: AtomicU64,
}

/// Lightweight metrics handle backed by atomics so it can be cloned cheaply.
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl Metrics {
    fn touch(&self) {
        self.inner
            .last_event_ts
            .store(now_unix_secs(), Ordering::Relaxed);
    }

    pub fn record_bet_added(&self, bet_id: &str) {
        self.inner.bets_added.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "bet_added",
            bet_id = %bet_id,
            total_added = self.inner.bets_added.load(Ordering::Relaxed),
            "bet added to slip"
        );
    }

    pub fn record_bet_removed(&self, bet_id: &str) {
        self.inner.bets_removed.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "bet_removed",
            bet_id = %bet_id,
            total_removed = self.inner.bets_removed.load(Ordering::Relaxed),
            "bet removed from slip"
        );
    }

    pub fn record_mirror_write(&self, user_id: &str) {
        self.inner.mirror_writes.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "mirror_write",
            user = %user_id,
            total_writes = self.inner.mirror_writes.load(Ordering::Relaxed),
            "slip mirrored"
        );
    }

    pub fn record_mirror_failure(&self, user_id: &str, reason: &str) {
        self.inner.mirror_failures.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "mirror_failed",
            user = %user_id,
            reason = %reason,
            total_failures = self.inner.mirror_failures.load(Ordering::Relaxed),
            "slip mirror failed"
        );
    }

    pub fn record_placement(&self, user_id: &str, records: usize) {
        self.inner.placements.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "placement",
            user = %user_id,
            records,
            total_placements = self.inner.placements.load(Ordering::Relaxed),
            "bets placed"
        );
    }

    pub fn record_placement_failure(&self, user_id: &str, reason: &str) {
        self.inner.placement_failures.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "placement_failed",
            user = %user_id,
            reason = %reason,
            total_failures = self.inner.placement_failures.load(Ordering::Relaxed),
            "placement failed"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bets_added: self.inner.bets_added.load(Ordering::Relaxed),
            bets_removed: self.inner.bets_removed.load(Ordering::Relaxed),
            mirror_writes: self.inner.mirror_writes.load(Ordering::Relaxed),
            mirror_failures: self.inner.mirror_failures.load(Ordering::Relaxed),
            placements: self.inner.placements.load(Ordering::Relaxed),
            placement_failures: self.inner.placement_failures.load(Ordering::Relaxed),
            last_event_ts: self.inner.last_event_ts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of current metrics used by the dashboard task.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub bets_added: u64,
    pub bets_removed: u64,
    pub mirror_writes: u64,
    pub mirror_failures: u64,
    pub placements: u64,
    pub placement_failures: u64,
    pub last_event_ts: u64,
}

pub fn log_metrics_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        target: "metrics",
        event = "metrics_snapshot",
        bets_added = snapshot.bets_added,
        bets_removed = snapshot.bets_removed,
        mirror_writes = snapshot.mirror_writes,
        mirror_failures = snapshot.mirror_failures,
        placements = snapshot.placements,
        placement_failures = snapshot.placement_failures,
        last_event_ts = snapshot.last_event_ts,
        "metrics snapshot"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_handle() {
        let m = Metrics::default();
        m.record_bet_added("g1-moneyline-home");
        m.record_bet_added("g2-moneyline-home");
        m.record_bet_removed("g1-moneyline-home");
        m.record_mirror_failure("demo", "timeout");
        let snap = m.snapshot();
        assert_eq!(snap.bets_added, 2);
        assert_eq!(snap.bets_removed, 1);
        assert_eq!(snap.mirror_failures, 1);
        assert_eq!(snap.placements, 0);
        assert!(snap.last_event_ts > 0);
    }
}

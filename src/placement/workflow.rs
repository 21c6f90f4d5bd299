use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::monitoring::metrics::METRICS;
use crate::placement::placed::PlacedBet;
use crate::storage::recorder::PlacementRecorder;
use crate::storage::{PlacedBetsStore, StoreError};
use crate::sync::SyncBridge;
use crate::types::PlacementConfig;

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("no bets selected")]
    EmptySlip,

    #[error("please enter stake amounts")]
    ZeroStake,

    #[error("a placement is already in progress")]
    AlreadyPlacing,

    #[error("failed to place bet, please try again: {0}")]
    Submission(#[from] StoreError),

    #[error("placed {} bet(s) before failing; they were removed from the slip, please retry the rest: {source}", .placed.len())]
    PartiallyPlaced {
        placed: Vec<PlacedBet>,
        source: StoreError,
    },
}

pub type PlacementResult<T> = Result<T, PlacementError>;

/// Where a placement currently is. Anything other than `Idle` means in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementStage {
    Idle,
    Validating,
    Processing,
    Success,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementDelays {
    pub validate: Duration,
    pub process: Duration,
    pub success: Duration,
}

impl PlacementDelays {
    pub fn none() -> Self {
        Self {
            validate: Duration::ZERO,
            process: Duration::ZERO,
            success: Duration::ZERO,
        }
    }
}

impl From<&PlacementConfig> for PlacementDelays {
    fn from(cfg: &PlacementConfig) -> Self {
        Self {
            validate: Duration::from_millis(cfg.validate_ms),
            process: Duration::from_millis(cfg.process_ms),
            success: Duration::from_millis(cfg.success_ms),
        }
    }
}

/// Outcome of a successful placement.
#[derive(Clone, Debug)]
pub struct PlacementReceipt {
    pub records: Vec<PlacedBet>,
    /// Refreshed view of the user's placed bets; `None` if the refresh failed.
    pub active_bets: Option<Vec<PlacedBet>>,
}

/// Turns the current slip into placed bets: validate, process, commit.
///
/// On success the slip is cleared through the bridge; on any failure the stage
/// returns to `Idle` and the slip is left exactly as it was so the user can retry.
pub struct BetPlacer {
    bets: Arc<dyn PlacedBetsStore>,
    delays: PlacementDelays,
    recorder: Option<PlacementRecorder>,
    stage_tx: watch::Sender<PlacementStage>,
}

impl BetPlacer {
    pub fn new(bets: Arc<dyn PlacedBetsStore>, delays: PlacementDelays) -> Self {
        let (stage_tx, _) = watch::channel(PlacementStage::Idle);
        Self {
            bets,
            delays,
            recorder: None,
            stage_tx,
        }
    }

    /// Also write every placed record to the Postgres audit trail.
    pub fn with_recorder(mut self, recorder: PlacementRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn stage(&self) -> PlacementStage {
        *self.stage_tx.borrow()
    }

    /// Watch stage transitions, e.g. to drive a progress indicator.
    pub fn subscribe(&self) -> watch::Receiver<PlacementStage> {
        self.stage_tx.subscribe()
    }

    /// UI surfaces must not be dismissed while this is true.
    pub fn is_placing(&self) -> bool {
        self.stage() != PlacementStage::Idle
    }

    pub async fn place(&self, bridge: &mut SyncBridge) -> PlacementResult<PlacementReceipt> {
        let user_id = bridge.user_id().to_string();
        let slip = bridge.slip().clone();

        if slip.is_empty() {
            warn!(target: "placement", user = %user_id, "rejected placement: empty slip");
            return Err(PlacementError::EmptySlip);
        }
        if slip.total_stake() <= 0.0 {
            warn!(target: "placement", user = %user_id, "rejected placement: zero stake");
            return Err(PlacementError::ZeroStake);
        }
        if !self.begin() {
            return Err(PlacementError::AlreadyPlacing);
        }
        // Back to Idle on every exit, including a dropped future.
        let _reset = StageReset(&self.stage_tx);

        info!(
            target: "placement",
            user = %user_id,
            legs = slip.len(),
            mode = %slip.mode(),
            total_stake = slip.total_stake(),
            "placement started"
        );
        tokio::time::sleep(self.delays.validate).await;

        self.stage_tx.send_replace(PlacementStage::Processing);
        tokio::time::sleep(self.delays.process).await;

        let mut records = PlacedBet::from_slip(&user_id, &slip, Utc::now());
        if let Err((appended, err)) = self.submit(&user_id, &records).await {
            METRICS.record_placement_failure(&user_id, &err.to_string());
            if appended == 0 {
                warn!(target: "placement", user = %user_id, error = %err, "placement failed; slip kept");
                return Err(err.into());
            }

            // Legs already accepted leave the slip so a retry cannot place them twice.
            records.truncate(appended);
            for record in &records {
                for leg in record.legs() {
                    bridge.remove_bet(&leg.id);
                }
            }
            warn!(
                target: "placement",
                user = %user_id,
                placed = appended,
                remaining = bridge.slip().len(),
                error = %err,
                "placement partially failed; placed legs removed from slip"
            );
            return Err(PlacementError::PartiallyPlaced {
                placed: records,
                source: err,
            });
        }

        self.stage_tx.send_replace(PlacementStage::Success);
        let active_bets = match self.bets.list(&user_id).await {
            Ok(bets) => Some(bets),
            Err(err) => {
                warn!(target: "placement", user = %user_id, error = %err, "failed to refresh placed bets");
                None
            }
        };
        bridge.clear();
        METRICS.record_placement(&user_id, records.len());
        info!(
            target: "placement",
            user = %user_id,
            records = records.len(),
            "placement succeeded; slip cleared"
        );

        tokio::time::sleep(self.delays.success).await;

        Ok(PlacementReceipt {
            records,
            active_bets,
        })
    }

    /// Move from `Idle` to `Validating`; false if a placement is already running.
    fn begin(&self) -> bool {
        self.stage_tx.send_if_modified(|stage| {
            if *stage == PlacementStage::Idle {
                *stage = PlacementStage::Validating;
                true
            } else {
                false
            }
        })
    }

    /// Append records in order. On failure, reports how many were appended first.
    async fn submit(&self, user_id: &str, records: &[PlacedBet]) -> Result<(), (usize, StoreError)> {
        for (appended, record) in records.iter().enumerate() {
            self.bets
                .append(user_id, record)
                .await
                .map_err(|err| (appended, err))?;
            if let Some(recorder) = &self.recorder {
                if let Err(err) = recorder.record(record).await {
                    warn!(
                        target: "storage",
                        error = %err,
                        bet_id = %record.id,
                        "failed to record placed bet in audit trail"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Returns the stage to `Idle` when dropped.
struct StageReset<'a>(&'a watch::Sender<PlacementStage>);

impl Drop for StageReset<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|stage| {
            if *stage == PlacementStage::Idle {
                false
            } else {
                *stage = PlacementStage::Idle;
                true
            }
        });
    }
}

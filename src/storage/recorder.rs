use sqlx::{query, Pool, Postgres};

use crate::placement::PlacedBet;
use crate::storage::models::PlacedBetRow;

/// Appends placed bets to the Postgres audit trail.
///
/// The expected schema (created via migrations) is:
/// ```sql
/// CREATE TABLE IF NOT EXISTS placed_bets (
///   id               UUID        PRIMARY KEY,
///   user_id          TEXT        NOT NULL,
///   placed_at        TIMESTAMPTZ NOT NULL,
///   kind             TEXT        NOT NULL,
///   stake            DOUBLE PRECISION NOT NULL,
///   odds             INTEGER     NOT NULL,
///   potential_payout DOUBLE PRECISION NOT NULL,
///   leg_count        INTEGER     NOT NULL,
///   legs_json        TEXT        NOT NULL
/// );
/// ```
#[derive(Clone)]
pub struct PlacementRecorder {
    pool: Pool<Postgres>,
}

impl PlacementRecorder {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn record(&self, bet: &PlacedBet) -> anyhow::Result<()> {
        let row = PlacedBetRow::try_from(bet)?;

        query(
            "INSERT INTO placed_bets \
             (id, user_id, placed_at, kind, stake, odds, potential_payout, leg_count, legs_json) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.placed_at)
        .bind(row.kind)
        .bind(row.stake)
        .bind(row.odds)
        .bind(row.potential_payout)
        .bind(row.leg_count)
        .bind(row.legs_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

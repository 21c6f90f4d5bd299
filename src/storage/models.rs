use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::placement::PlacedBet;

/// Row model for the `placed_bets` audit table.
///
/// Legs are stored as a JSON array so single and parlay records share one shape.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlacedBetRow {
    pub id: Uuid,
    pub user_id: String,
    pub placed_at: DateTime<Utc>,
    pub kind: String,
    pub stake: f64,
    pub odds: i32,
    pub potential_payout: f64,
    pub leg_count: i32,
    pub legs_json: String,
}

impl TryFrom<&PlacedBet> for PlacedBetRow {
    type Error = serde_json::Error;

    fn try_from(bet: &PlacedBet) -> Result<Self, Self::Error> {
        Ok(Self {
            id: bet.id,
            user_id: bet.user_id.clone(),
            placed_at: bet.placed_at,
            kind: bet.label().to_string(),
            stake: bet.stake,
            odds: bet.odds,
            potential_payout: bet.potential_payout,
            leg_count: bet.legs().len() as i32,
            legs_json: serde_json::to_string(bet.legs())?,
        })
    }
}

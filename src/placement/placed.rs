use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slip::{BetLeg, Slip, SlipMode};

/// Identifier assigned to a placed bet at submission time.
pub type PlacedBetId = Uuid;

/// What a placed record covers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacedBetKind {
    /// One leg settled on its own.
    Single { leg: BetLeg },
    /// All legs combined; every one must win.
    Parlay { legs_of_parlay: Vec<BetLeg> },
}

/// Record of a bet handed to the placed-bets collection. Never modified afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedBet {
    pub id: PlacedBetId,
    pub user_id: String,
    pub placed_at: DateTime<Utc>,
    pub stake: f64,
    /// American odds; the combined price for a parlay.
    pub odds: i32,
    pub potential_payout: f64,
    pub kind: PlacedBetKind,
}

impl PlacedBet {
    pub fn single(user_id: &str, leg: BetLeg, placed_at: DateTime<Utc>) -> Self {
        Self {
            id: PlacedBetId::new_v4(),
            user_id: user_id.to_string(),
            placed_at,
            stake: leg.stake,
            odds: leg.odds.value(),
            potential_payout: leg.potential_payout,
            kind: PlacedBetKind::Single { leg },
        }
    }

    /// One record wrapping every leg of a parlay slip, priced at the slip's combined odds.
    pub fn parlay(user_id: &str, slip: &Slip, placed_at: DateTime<Utc>) -> Self {
        Self {
            id: PlacedBetId::new_v4(),
            user_id: user_id.to_string(),
            placed_at,
            stake: slip.total_stake(),
            odds: slip.combined_odds(),
            potential_payout: slip.total_payout(),
            kind: PlacedBetKind::Parlay {
                legs_of_parlay: slip.legs().to_vec(),
            },
        }
    }

    /// Records for placing `slip`: one per leg in single mode, one combined record in parlay mode.
    pub fn from_slip(user_id: &str, slip: &Slip, placed_at: DateTime<Utc>) -> Vec<Self> {
        match slip.mode() {
            SlipMode::Parlay => vec![Self::parlay(user_id, slip, placed_at)],
            SlipMode::Single => slip
                .legs()
                .iter()
                .filter(|leg| leg.stake > 0.0)
                .cloned()
                .map(|leg| Self::single(user_id, leg, placed_at))
                .collect(),
        }
    }

    pub fn legs(&self) -> &[BetLeg] {
        match &self.kind {
            PlacedBetKind::Single { leg } => std::slice::from_ref(leg),
            PlacedBetKind::Parlay { legs_of_parlay } => legs_of_parlay,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            PlacedBetKind::Single { .. } => "single",
            PlacedBetKind::Parlay { .. } => "parlay",
        }
    }

    pub fn description(&self) -> String {
        match &self.kind {
            PlacedBetKind::Single { leg } => {
                format!("{} ({})", leg.description(), leg.game.matchup())
            }
            PlacedBetKind::Parlay { legs_of_parlay } => {
                format!("Parlay ({} picks)", legs_of_parlay.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slip::store::{add_bet, set_mode, update_stake};
    use crate::slip::tests::{game, odds};
    use crate::slip::{BetRequest, Market, Selection, SlipParams};

    fn two_leg_slip() -> Slip {
        let params = SlipParams::default();
        let slip = add_bet(
            &Slip::empty(),
            &params,
            BetRequest::new(game("g1"), Market::Moneyline, Selection::Home, odds(120)),
        );
        add_bet(
            &slip,
            &params,
            BetRequest::new(game("g2"), Market::Moneyline, Selection::Away, odds(-110)),
        )
    }

    #[test]
    fn single_mode_places_each_leg() {
        let slip = two_leg_slip();
        let records = PlacedBet::from_slip("demo", &slip, Utc::now());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.label() == "single"));
        assert_eq!(records[0].odds, 120);
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn zero_stake_legs_are_skipped_in_single_mode() {
        let slip = update_stake(&two_leg_slip(), &SlipParams::default(), "g1-moneyline-home", 0.0);
        let records = PlacedBet::from_slip("demo", &slip, Utc::now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].legs()[0].id, "g2-moneyline-away");
    }

    #[test]
    fn parlay_mode_places_one_record() {
        let slip = set_mode(&two_leg_slip(), SlipMode::Parlay);
        let records = PlacedBet::from_slip("demo", &slip, Utc::now());
        assert_eq!(records.len(), 1);
        let parlay = &records[0];
        assert_eq!(parlay.legs().len(), 2);
        assert_eq!(parlay.odds, 320);
        assert_eq!(parlay.stake, 10.0);
        assert!((parlay.potential_payout - 42.0).abs() < 1e-9);
        assert_eq!(parlay.description(), "Parlay (2 picks)");
    }

    #[test]
    fn kind_is_tagged_in_json() {
        let slip = set_mode(&two_leg_slip(), SlipMode::Parlay);
        let record = PlacedBet::parlay("demo", &slip, Utc::now());
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["kind"]["type"], "parlay");
        assert_eq!(v["kind"]["legs_of_parlay"].as_array().unwrap().len(), 2);
        let back: PlacedBet = serde_json::from_value(v).unwrap();
        assert_eq!(back, record);
    }
}

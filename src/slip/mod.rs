use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::math::{combine_american_odds, format_american, format_line, payout};

pub mod identity;
pub mod params;
pub mod store;

pub use params::SlipParams;
pub use store::SlipStore;

/// A string did not name any variant of one of the closed slip enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Market a selection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Spread,
    Moneyline,
    Total,
    PlayerProp,
    PeriodWinner,
    QuarterWinner,
    HalfWinner,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Spread => "spread",
            Market::Moneyline => "moneyline",
            Market::Total => "total",
            Market::PlayerProp => "player_prop",
            Market::PeriodWinner => "period_winner",
            Market::QuarterWinner => "quarter_winner",
            Market::HalfWinner => "half_winner",
        }
    }

    pub fn is_player_prop(&self) -> bool {
        matches!(self, Market::PlayerProp)
    }

    /// Period/quarter/half markets are quoted per sub-period.
    pub fn takes_sub_period(&self) -> bool {
        matches!(
            self,
            Market::PeriodWinner | Market::QuarterWinner | Market::HalfWinner
        )
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spread" => Ok(Market::Spread),
            "moneyline" | "ml" => Ok(Market::Moneyline),
            "total" => Ok(Market::Total),
            "player_prop" | "prop" => Ok(Market::PlayerProp),
            "period_winner" | "period" => Ok(Market::PeriodWinner),
            "quarter_winner" | "quarter" => Ok(Market::QuarterWinner),
            "half_winner" | "half" => Ok(Market::HalfWinner),
            other => Err(UnknownVariant {
                kind: "market",
                value: other.to_string(),
            }),
        }
    }
}

/// Side of a market the user picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Home,
    Away,
    Over,
    Under,
}

impl Selection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Selection::Home => "home",
            Selection::Away => "away",
            Selection::Over => "over",
            Selection::Under => "under",
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Selection {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Selection::Home),
            "away" => Ok(Selection::Away),
            "over" => Ok(Selection::Over),
            "under" => Ok(Selection::Under),
            other => Err(UnknownVariant {
                kind: "selection",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether legs are settled independently or combined into one parlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlipMode {
    #[default]
    Single,
    Parlay,
}

impl SlipMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlipMode::Single => "single",
            SlipMode::Parlay => "parlay",
        }
    }
}

impl fmt::Display for SlipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlipMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(SlipMode::Single),
            "parlay" => Ok(SlipMode::Parlay),
            other => Err(UnknownVariant {
                kind: "mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Zero is not a price in the American convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("american odds cannot be zero")]
pub struct InvalidOdds;

/// Non-zero American odds. Serialized as a plain signed integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct AmericanOdds(i32);

impl AmericanOdds {
    pub fn new(value: i32) -> Result<Self, InvalidOdds> {
        if value == 0 {
            Err(InvalidOdds)
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for AmericanOdds {
    type Error = InvalidOdds;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AmericanOdds> for i32 {
    fn from(odds: AmericanOdds) -> Self {
        odds.0
    }
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_american(self.0))
    }
}

/// Price of one selection as supplied by the catalog at the moment a bet is added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub odds: AmericanOdds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// Denormalized view of the event a leg was taken on; the slip does not own game data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

impl GameSnapshot {
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropCategory {
    Passing,
    Rushing,
    Receiving,
    Scoring,
    Defense,
    Kicking,
}

/// Player prop a leg was taken on. `prop_id` identifies the prop instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPropRef {
    pub prop_id: String,
    pub player_id: String,
    pub player_name: String,
    pub stat_type: String,
    pub category: PropCategory,
}

/// Everything needed to add one selection to a slip.
#[derive(Clone, Debug, PartialEq)]
pub struct BetRequest {
    pub game: GameSnapshot,
    pub market: Market,
    pub selection: Selection,
    pub odds: AmericanOdds,
    pub line: Option<f64>,
    pub player_prop: Option<PlayerPropRef>,
    pub sub_period: Option<String>,
}

impl BetRequest {
    pub fn new(game: GameSnapshot, market: Market, selection: Selection, odds: AmericanOdds) -> Self {
        Self {
            game,
            market,
            selection,
            odds,
            line: None,
            player_prop: None,
            sub_period: None,
        }
    }

    pub fn with_line(mut self, line: f64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_player_prop(mut self, prop: PlayerPropRef) -> Self {
        self.player_prop = Some(prop);
        self
    }

    pub fn with_sub_period(mut self, sub_period: impl Into<String>) -> Self {
        self.sub_period = Some(sub_period.into());
        self
    }

    /// Deterministic leg id this request would produce.
    pub fn id(&self) -> String {
        identity::bet_id(
            &self.game.id,
            self.market,
            self.sub_period.as_deref(),
            self.player_prop.as_ref().map(|p| p.prop_id.as_str()),
            self.selection,
        )
    }
}

/// One selection on the slip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BetLeg {
    pub id: String,
    pub game: GameSnapshot,
    pub market: Market,
    pub selection: Selection,
    pub odds: AmericanOdds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_prop: Option<PlayerPropRef>,
    pub stake: f64,
    pub potential_payout: f64,
}

impl BetLeg {
    pub fn from_request(req: BetRequest, stake: f64) -> Self {
        let id = req.id();
        Self {
            id,
            game: req.game,
            market: req.market,
            selection: req.selection,
            odds: req.odds,
            line: req.line,
            sub_period: req.sub_period,
            player_prop: req.player_prop,
            stake,
            potential_payout: stake + payout(stake, req.odds.value()),
        }
    }

    pub fn source_game_id(&self) -> &str {
        &self.game.id
    }

    /// Copy of this leg at a different stake, payout recomputed from its own odds.
    pub fn with_stake(&self, stake: f64) -> Self {
        let stake = stake.max(0.0);
        Self {
            stake,
            potential_payout: stake + payout(stake, self.odds.value()),
            ..self.clone()
        }
    }

    /// Short human description, e.g. `KC -3.5`, `Over 47.5`, `P. Mahomes passing yards Over 275.5`.
    pub fn description(&self) -> String {
        let team = match self.selection {
            Selection::Home => self.game.home_team.as_str(),
            Selection::Away => self.game.away_team.as_str(),
            Selection::Over => "Over",
            Selection::Under => "Under",
        };
        let line = self.line.map(format_line).unwrap_or_default();
        match self.market {
            Market::Spread => format!("{team} {line}").trim_end().to_string(),
            Market::Moneyline => format!("{team} ML"),
            Market::Total => format!("{team} {}", self.line.map(|l| l.to_string()).unwrap_or_default())
                .trim_end()
                .to_string(),
            Market::PlayerProp => match &self.player_prop {
                Some(prop) => format!(
                    "{} {} {team} {}",
                    prop.player_name,
                    prop.stat_type,
                    self.line.map(|l| l.to_string()).unwrap_or_default()
                )
                .trim_end()
                .to_string(),
                None => "Player Prop".to_string(),
            },
            Market::PeriodWinner | Market::QuarterWinner | Market::HalfWinner => {
                let unit = match self.market {
                    Market::PeriodWinner => "Period",
                    Market::QuarterWinner => "Quarter",
                    _ => "Half",
                };
                match &self.sub_period {
                    Some(sub) => format!("{team} {sub} {unit}"),
                    None => format!("{team} {unit}"),
                }
            }
        }
    }
}

/// Snapshot of the bet slip. Mode and totals are always derived from the legs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Slip {
    legs: Vec<BetLeg>,
    mode: SlipMode,
    total_stake: f64,
    total_payout: f64,
    combined_odds: i32,
}

impl Slip {
    /// Canonical empty slip.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a consistent snapshot from legs and the mode the caller asked for.
    ///
    /// Duplicate ids keep their first occurrence, stakes are floored at zero and
    /// each leg's payout is recomputed. Fewer than two legs always means single
    /// mode; in parlay mode every leg takes the first leg's stake.
    pub fn normalized(legs: Vec<BetLeg>, requested: SlipMode) -> Self {
        let mut unique: Vec<BetLeg> = Vec::with_capacity(legs.len());
        for leg in legs {
            if unique.iter().all(|l| l.id != leg.id) {
                unique.push(leg);
            }
        }

        let mode = if unique.len() < 2 {
            SlipMode::Single
        } else {
            requested
        };

        let legs: Vec<BetLeg> = match mode {
            SlipMode::Single => unique.iter().map(|l| l.with_stake(l.stake)).collect(),
            SlipMode::Parlay => {
                let shared = unique.first().map(|l| l.stake).unwrap_or(0.0);
                unique.iter().map(|l| l.with_stake(shared)).collect()
            }
        };

        if legs.is_empty() {
            return Self::empty();
        }

        match mode {
            SlipMode::Single => Self {
                total_stake: legs.iter().map(|l| l.stake).sum(),
                total_payout: legs.iter().map(|l| l.potential_payout).sum(),
                combined_odds: 0,
                legs,
                mode,
            },
            SlipMode::Parlay => {
                let total_stake = legs[0].stake;
                let odds: Vec<i32> = legs.iter().map(|l| l.odds.value()).collect();
                let combined_odds = combine_american_odds(&odds).unwrap_or(0);
                Self {
                    total_payout: total_stake + payout(total_stake, combined_odds),
                    total_stake,
                    combined_odds,
                    legs,
                    mode,
                }
            }
        }
    }

    /// Re-derive mode and totals, e.g. for a snapshot read back from a remote store.
    pub fn normalize(self) -> Self {
        let mode = self.mode;
        Self::normalized(self.legs, mode)
    }

    pub fn legs(&self) -> &[BetLeg] {
        &self.legs
    }

    pub fn mode(&self) -> SlipMode {
        self.mode
    }

    pub fn total_stake(&self) -> f64 {
        self.total_stake
    }

    pub fn total_payout(&self) -> f64 {
        self.total_payout
    }

    /// Combined parlay price; `0` outside parlay mode.
    pub fn combined_odds(&self) -> i32 {
        self.combined_odds
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn leg(&self, id: &str) -> Option<&BetLeg> {
        self.legs.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.leg(id).is_some()
    }

    pub fn into_legs(self) -> Vec<BetLeg> {
        self.legs
    }
}

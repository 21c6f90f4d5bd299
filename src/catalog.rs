//! Game/market catalog: resolves a selection to the odds quote offered for it.
//!
//! Loaded from a JSON file of upcoming games with their lines and player props.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::slip::{
    AmericanOdds, BetRequest, GameSnapshot, Market, OddsQuote, PlayerPropRef, PropCategory,
    Selection,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("unknown game: {0}")]
    UnknownGame(String),

    #[error("{market} {selection} is not offered for game {game_id}")]
    Unavailable {
        game_id: String,
        market: Market,
        selection: Selection,
    },

    #[error("{0} requires a sub-period")]
    MissingSubPeriod(Market),

    #[error("player prop requires a prop id")]
    MissingPropId,

    #[error("unknown prop {prop_id} for game {game_id}")]
    UnknownProp { game_id: String, prop_id: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Home/away quotes for a two-sided team market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamQuotes {
    pub home: OddsQuote,
    pub away: OddsQuote,
}

/// Over/under quotes for a total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TotalQuotes {
    pub over: OddsQuote,
    pub under: OddsQuote,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameOdds {
    #[serde(default)]
    pub spread: Option<TeamQuotes>,
    #[serde(default)]
    pub moneyline: Option<TeamQuotes>,
    #[serde(default)]
    pub total: Option<TotalQuotes>,
    #[serde(default)]
    pub period_winners: BTreeMap<String, TeamQuotes>,
    #[serde(default)]
    pub quarter_winners: BTreeMap<String, TeamQuotes>,
    #[serde(default)]
    pub half_winners: BTreeMap<String, TeamQuotes>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropTeam {
    Home,
    Away,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPropOffer {
    pub id: String,
    pub player_id: String,
    pub player_name: String,
    #[serde(default)]
    pub position: Option<String>,
    pub team: PropTeam,
    pub stat_type: String,
    pub category: PropCategory,
    pub line: f64,
    pub over_odds: AmericanOdds,
    pub under_odds: AmericanOdds,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl PlayerPropOffer {
    pub fn to_prop_ref(&self) -> PlayerPropRef {
        PlayerPropRef {
            prop_id: self.id.clone(),
            player_id: self.player_id.clone(),
            player_name: self.player_name.clone(),
            stat_type: self.stat_type.clone(),
            category: self.category,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogGame {
    pub id: String,
    #[serde(default)]
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    pub odds: GameOdds,
    #[serde(default)]
    pub player_props: Vec<PlayerPropOffer>,
}

impl CatalogGame {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            start_time: self.start_time,
        }
    }

    pub fn props_in(&self, category: PropCategory) -> impl Iterator<Item = &PlayerPropOffer> {
        self.player_props
            .iter()
            .filter(move |p| p.category == category)
    }

    fn prop(&self, prop_id: &str) -> CatalogResult<&PlayerPropOffer> {
        self.player_props
            .iter()
            .find(|p| p.id == prop_id)
            .ok_or_else(|| CatalogError::UnknownProp {
                game_id: self.id.clone(),
                prop_id: prop_id.to_string(),
            })
    }

    fn quote(
        &self,
        market: Market,
        selection: Selection,
        sub_period: Option<&str>,
        prop_id: Option<&str>,
    ) -> CatalogResult<OddsQuote> {
        let unavailable = || CatalogError::Unavailable {
            game_id: self.id.clone(),
            market,
            selection,
        };
        let team_side = |quotes: &TeamQuotes| match selection {
            Selection::Home => Ok(quotes.home.clone()),
            Selection::Away => Ok(quotes.away.clone()),
            Selection::Over | Selection::Under => Err(unavailable()),
        };

        match market {
            Market::Spread => self.odds.spread.as_ref().ok_or_else(unavailable).and_then(team_side),
            Market::Moneyline => self
                .odds
                .moneyline
                .as_ref()
                .ok_or_else(unavailable)
                .and_then(team_side),
            Market::Total => {
                let total = self.odds.total.as_ref().ok_or_else(unavailable)?;
                match selection {
                    Selection::Over => Ok(total.over.clone()),
                    Selection::Under => Ok(total.under.clone()),
                    Selection::Home | Selection::Away => Err(unavailable()),
                }
            }
            Market::PeriodWinner | Market::QuarterWinner | Market::HalfWinner => {
                let sub = sub_period.ok_or(CatalogError::MissingSubPeriod(market))?;
                let table = match market {
                    Market::PeriodWinner => &self.odds.period_winners,
                    Market::QuarterWinner => &self.odds.quarter_winners,
                    _ => &self.odds.half_winners,
                };
                table.get(sub).ok_or_else(unavailable).and_then(team_side)
            }
            Market::PlayerProp => {
                let prop = self.prop(prop_id.ok_or(CatalogError::MissingPropId)?)?;
                let odds = match selection {
                    Selection::Over => prop.over_odds,
                    Selection::Under => prop.under_odds,
                    Selection::Home | Selection::Away => return Err(unavailable()),
                };
                Ok(OddsQuote {
                    odds,
                    line: Some(prop.line),
                    last_updated: prop.last_updated,
                })
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameCatalog {
    #[serde(default)]
    games: Vec<CatalogGame>,
}

impl GameCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&contents)?;
        info!(
            target: "catalog",
            path = %path.display(),
            games = catalog.games.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_json(contents: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn games(&self) -> &[CatalogGame] {
        &self.games
    }

    pub fn game(&self, game_id: &str) -> CatalogResult<&CatalogGame> {
        self.games
            .iter()
            .find(|g| g.id == game_id)
            .ok_or_else(|| CatalogError::UnknownGame(game_id.to_string()))
    }

    /// Current quote for one selection.
    pub fn quote(
        &self,
        game_id: &str,
        market: Market,
        selection: Selection,
        sub_period: Option<&str>,
        prop_id: Option<&str>,
    ) -> CatalogResult<OddsQuote> {
        self.game(game_id)?
            .quote(market, selection, sub_period, prop_id)
    }

    /// Build the slip request for one selection, snapshotting the current quote.
    pub fn request(
        &self,
        game_id: &str,
        market: Market,
        selection: Selection,
        sub_period: Option<&str>,
        prop_id: Option<&str>,
    ) -> CatalogResult<BetRequest> {
        let game = self.game(game_id)?;
        let quote = game.quote(market, selection, sub_period, prop_id)?;

        let mut req = BetRequest::new(game.snapshot(), market, selection, quote.odds);
        if let Some(line) = quote.line {
            req = req.with_line(line);
        }
        if market.takes_sub_period() {
            if let Some(sub) = sub_period {
                req = req.with_sub_period(sub);
            }
        }
        if market.is_player_prop() {
            if let Some(prop_id) = prop_id {
                req = req.with_player_prop(game.prop(prop_id)?.to_prop_ref());
            }
        }
        Ok(req)
    }
}

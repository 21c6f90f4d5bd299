use tracing::debug;

use crate::monitoring::metrics::METRICS;
use crate::slip::{identity, BetLeg, BetRequest, Slip, SlipMode, SlipParams};

/// Add a selection, or take it off the slip when the same selection is already there.
///
/// Picking the other side of a game line replaces the earlier pick on that
/// position; the new leg starts at the house default stake.
pub fn add_bet(slip: &Slip, params: &SlipParams, req: BetRequest) -> Slip {
    let id = req.id();
    if slip.contains(&id) {
        return remove_bet(slip, &id);
    }

    let mut legs: Vec<BetLeg> = slip
        .legs()
        .iter()
        .filter(|leg| !identity::same_position(leg, &req))
        .cloned()
        .collect();
    legs.push(BetLeg::from_request(req, params.opening_stake()));

    Slip::normalized(legs, slip.mode())
}

pub fn remove_bet(slip: &Slip, id: &str) -> Slip {
    let legs: Vec<BetLeg> = slip.legs().iter().filter(|l| l.id != id).cloned().collect();
    Slip::normalized(legs, slip.mode())
}

/// Set a leg's stake, clamped to `[0, max_stake]`. In parlay mode the stake is shared
/// and every leg takes the new value.
pub fn update_stake(slip: &Slip, params: &SlipParams, id: &str, stake: f64) -> Slip {
    if !slip.contains(id) {
        return slip.clone();
    }
    let stake = params.clamp(stake);

    let legs: Vec<BetLeg> = match slip.mode() {
        SlipMode::Single => slip
            .legs()
            .iter()
            .map(|l| if l.id == id { l.with_stake(stake) } else { l.clone() })
            .collect(),
        SlipMode::Parlay => slip.legs().iter().map(|l| l.with_stake(stake)).collect(),
    };

    Slip::normalized(legs, slip.mode())
}

/// Switch between single and parlay. Parlay needs at least two legs, otherwise
/// the slip comes back unchanged.
pub fn set_mode(slip: &Slip, mode: SlipMode) -> Slip {
    if mode == SlipMode::Parlay && slip.len() < 2 {
        return slip.clone();
    }
    Slip::normalized(slip.legs().to_vec(), mode)
}

pub fn clear_slip() -> Slip {
    Slip::empty()
}

/// Re-derive a snapshot from elsewhere (e.g. the remote store) under these params,
/// so no leg is above the stake cap.
pub fn adopt_slip(slip: Slip, params: &SlipParams) -> Slip {
    let mode = slip.mode();
    let legs = slip
        .into_legs()
        .into_iter()
        .map(|leg| leg.with_stake(params.clamp(leg.stake)))
        .collect();
    Slip::normalized(legs, mode)
}

/// Holds the current slip snapshot and applies mutations to it.
#[derive(Debug, Clone, Default)]
pub struct SlipStore {
    params: SlipParams,
    slip: Slip,
}

impl SlipStore {
    pub fn new(params: SlipParams) -> Self {
        Self {
            params,
            slip: Slip::empty(),
        }
    }

    pub fn params(&self) -> &SlipParams {
        &self.params
    }

    pub fn slip(&self) -> &Slip {
        &self.slip
    }

    pub fn add_bet(&mut self, req: BetRequest) -> &Slip {
        let id = req.id();
        let had = self.slip.contains(&id);
        self.slip = add_bet(&self.slip, &self.params, req);
        if had {
            METRICS.record_bet_removed(&id);
        } else {
            METRICS.record_bet_added(&id);
        }
        debug!(
            target: "slip",
            bet_id = %id,
            toggled_off = had,
            legs = self.slip.len(),
            mode = %self.slip.mode(),
            "add_bet applied"
        );
        &self.slip
    }

    pub fn remove_bet(&mut self, id: &str) -> &Slip {
        let before = self.slip.len();
        self.slip = remove_bet(&self.slip, id);
        if self.slip.len() < before {
            METRICS.record_bet_removed(id);
        }
        debug!(target: "slip", bet_id = %id, legs = self.slip.len(), mode = %self.slip.mode(), "remove_bet applied");
        &self.slip
    }

    pub fn update_stake(&mut self, id: &str, stake: f64) -> &Slip {
        self.slip = update_stake(&self.slip, &self.params, id, stake);
        debug!(
            target: "slip",
            bet_id = %id,
            requested = stake,
            total_stake = self.slip.total_stake(),
            "update_stake applied"
        );
        &self.slip
    }

    pub fn set_mode(&mut self, mode: SlipMode) -> &Slip {
        self.slip = set_mode(&self.slip, mode);
        debug!(target: "slip", requested = %mode, mode = %self.slip.mode(), "set_mode applied");
        &self.slip
    }

    pub fn clear(&mut self) -> &Slip {
        self.slip = clear_slip();
        debug!(target: "slip", "slip cleared");
        &self.slip
    }

    /// Replace the whole snapshot, re-deriving mode and totals and capping stakes.
    pub fn replace(&mut self, slip: Slip) -> &Slip {
        self.slip = adopt_slip(slip, &self.params);
        &self.slip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slip::tests::{game, leg, odds};
    use crate::slip::{Market, PlayerPropRef, PropCategory, Selection};
    use crate::utils::math::round_cents;

    fn ml(game_id: &str, selection: Selection, o: i32) -> BetRequest {
        BetRequest::new(game(game_id), Market::Moneyline, selection, odds(o))
    }

    fn prop_bet(prop_id: &str, selection: Selection) -> BetRequest {
        BetRequest::new(game("g1"), Market::PlayerProp, selection, odds(-115))
            .with_line(275.5)
            .with_player_prop(PlayerPropRef {
                prop_id: prop_id.to_string(),
                player_id: "p15".to_string(),
                player_name: "P. Mahomes".to_string(),
                stat_type: "passing yards".to_string(),
                category: PropCategory::Passing,
            })
    }

    fn params() -> SlipParams {
        SlipParams::default()
    }

    #[test]
    fn add_uses_default_stake() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, -150));
        assert_eq!(slip.len(), 1);
        let leg = &slip.legs()[0];
        assert_eq!(leg.id, "g1-moneyline-home");
        assert_eq!(leg.stake, 10.0);
        assert_eq!(round_cents(leg.potential_payout), 16.67);
        assert_eq!(slip.mode(), SlipMode::Single);
    }

    #[test]
    fn adding_twice_toggles_off() {
        let base = add_bet(&Slip::empty(), &params(), ml("g2", Selection::Away, 130));
        let once = add_bet(&base, &params(), ml("g1", Selection::Home, -150));
        let twice = add_bet(&once, &params(), ml("g1", Selection::Home, -150));
        assert_eq!(twice, base);
    }

    #[test]
    fn other_side_replaces_pick() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, -150));
        let slip = add_bet(&slip, &params(), ml("g1", Selection::Away, 130));
        assert_eq!(slip.len(), 1);
        assert_eq!(slip.legs()[0].selection, Selection::Away);
    }

    #[test]
    fn different_markets_on_one_game_coexist() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, -150));
        let total = BetRequest::new(game("g1"), Market::Total, Selection::Over, odds(-110)).with_line(47.5);
        let slip = add_bet(&slip, &params(), total);
        assert_eq!(slip.len(), 2);
    }

    #[test]
    fn sub_period_picks_coexist_and_replace_within_period() {
        let q = |sel, sub: &str| {
            BetRequest::new(game("g1"), Market::QuarterWinner, sel, odds(105)).with_sub_period(sub)
        };
        let slip = add_bet(&Slip::empty(), &params(), q(Selection::Home, "1st"));
        let slip = add_bet(&slip, &params(), q(Selection::Home, "2nd"));
        assert_eq!(slip.len(), 2);
        let slip = add_bet(&slip, &params(), q(Selection::Away, "1st"));
        assert_eq!(slip.len(), 2);
        assert!(slip.contains("g1-quarter_winner-1st-away"));
        assert!(!slip.contains("g1-quarter_winner-1st-home"));
        assert!(slip.contains("g1-quarter_winner-2nd-home"));
    }

    #[test]
    fn player_props_are_independent_per_prop() {
        let slip = add_bet(&Slip::empty(), &params(), prop_bet("a", Selection::Over));
        let slip = add_bet(&slip, &params(), prop_bet("b", Selection::Under));
        assert_eq!(slip.len(), 2);
        // Same prop, other side: replaces.
        let slip = add_bet(&slip, &params(), prop_bet("a", Selection::Under));
        assert_eq!(slip.len(), 2);
        assert!(slip.contains("g1-player_prop-a-under"));
        assert!(!slip.contains("g1-player_prop-a-over"));
    }

    #[test]
    fn add_keeps_parlay_mode() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        let slip = add_bet(&slip, &params(), ml("g2", Selection::Home, -110));
        let slip = set_mode(&slip, SlipMode::Parlay);
        let slip = update_stake(&slip, &params(), "g1-moneyline-home", 25.0);
        let slip = add_bet(&slip, &params(), ml("g3", Selection::Away, 150));
        assert_eq!(slip.mode(), SlipMode::Parlay);
        assert!(slip.legs().iter().all(|l| l.stake == 25.0));
    }

    #[test]
    fn remove_demotes_parlay() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        let slip = add_bet(&slip, &params(), ml("g2", Selection::Home, -110));
        let slip = set_mode(&slip, SlipMode::Parlay);
        assert_eq!(slip.mode(), SlipMode::Parlay);
        let slip = remove_bet(&slip, "g2-moneyline-home");
        assert_eq!(slip.mode(), SlipMode::Single);
        assert_eq!(slip.combined_odds(), 0);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        assert_eq!(remove_bet(&slip, "nope"), slip);
    }

    #[test]
    fn parlay_stake_is_shared() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        let slip = add_bet(&slip, &params(), ml("g2", Selection::Home, -110));
        let slip = set_mode(&slip, SlipMode::Parlay);
        let slip = update_stake(&slip, &params(), "g2-moneyline-home", 25.0);

        for leg in slip.legs() {
            assert_eq!(leg.stake, 25.0);
        }
        assert!((slip.legs()[0].potential_payout - 55.0).abs() < 1e-9);
        assert!((slip.legs()[1].potential_payout - (25.0 + 25.0 * 100.0 / 110.0)).abs() < 1e-9);
        assert_eq!(slip.total_stake(), 25.0);
        assert_eq!(slip.combined_odds(), 320);
        assert!((slip.total_payout() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn single_stake_touches_one_leg() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        let slip = add_bet(&slip, &params(), ml("g2", Selection::Home, -110));
        let slip = update_stake(&slip, &params(), "g1-moneyline-home", 50.0);
        assert_eq!(slip.legs()[0].stake, 50.0);
        assert_eq!(slip.legs()[1].stake, 10.0);
        assert_eq!(slip.total_stake(), 60.0);
    }

    #[test]
    fn stake_is_clamped() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        let neg = update_stake(&slip, &params(), "g1-moneyline-home", -20.0);
        assert_eq!(neg.legs()[0].stake, 0.0);
        assert_eq!(neg.total_payout(), 0.0);
        let big = update_stake(&slip, &params(), "g1-moneyline-home", 1e9);
        assert_eq!(big.legs()[0].stake, 10_000.0);
        let nan = update_stake(&slip, &params(), "g1-moneyline-home", f64::NAN);
        assert_eq!(nan.legs()[0].stake, 0.0);
    }

    #[test]
    fn parlay_with_one_leg_is_noop() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        assert_eq!(set_mode(&slip, SlipMode::Parlay), slip);
    }

    #[test]
    fn set_mode_keeps_odds_and_lines() {
        let spread = BetRequest::new(game("g1"), Market::Spread, Selection::Home, odds(-110)).with_line(-3.5);
        let slip = add_bet(&Slip::empty(), &params(), spread);
        let slip = add_bet(&slip, &params(), ml("g2", Selection::Away, 150));
        let parlay = set_mode(&slip, SlipMode::Parlay);
        for (a, b) in slip.legs().iter().zip(parlay.legs()) {
            assert_eq!(a.odds, b.odds);
            assert_eq!(a.line, b.line);
        }
        assert_ne!(parlay.combined_odds(), 0);
        let back = set_mode(&parlay, SlipMode::Single);
        assert_eq!(back.combined_odds(), 0);
        assert!((back.total_stake() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn clear_returns_canonical_empty() {
        let slip = add_bet(&Slip::empty(), &params(), ml("g1", Selection::Home, 120));
        let slip = add_bet(&slip, &params(), ml("g2", Selection::Home, -110));
        let slip = set_mode(&slip, SlipMode::Parlay);
        assert!(!slip.is_empty());
        let cleared = clear_slip();
        assert_eq!(cleared, Slip::empty());
        assert_eq!(cleared.mode(), SlipMode::Single);
        assert_eq!(cleared.total_stake(), 0.0);
        assert_eq!(cleared.total_payout(), 0.0);
        assert_eq!(cleared.combined_odds(), 0);
    }

    #[test]
    fn opening_stake_never_exceeds_cap() {
        let params = SlipParams {
            default_stake: 50.0,
            max_stake: 20.0,
        };
        let slip = add_bet(&Slip::empty(), &params, ml("g1", Selection::Home, -150));
        assert_eq!(slip.legs()[0].stake, 20.0);
        assert_eq!(slip.total_stake(), 20.0);
    }

    #[test]
    fn replaced_slip_is_capped() {
        let over_cap = Slip::normalized(
            vec![
                leg("g1", Market::Moneyline, Selection::Home, 120, 500.0),
                leg("g2", Market::Moneyline, Selection::Home, -110, 50.0),
            ],
            SlipMode::Single,
        );
        let mut store = SlipStore::new(SlipParams {
            default_stake: 10.0,
            max_stake: 100.0,
        });
        let slip = store.replace(over_cap);
        assert_eq!(slip.legs()[0].stake, 100.0);
        assert!((slip.legs()[0].potential_payout - 220.0).abs() < 1e-9);
        assert_eq!(slip.legs()[1].stake, 50.0);
        assert_eq!(slip.total_stake(), 150.0);
    }

    #[test]
    fn store_applies_mutations() {
        let mut store = SlipStore::new(params());
        store.add_bet(ml("g1", Selection::Home, 120));
        store.add_bet(ml("g2", Selection::Home, -110));
        store.set_mode(SlipMode::Parlay);
        store.update_stake("g1-moneyline-home", 15.0);
        assert_eq!(store.slip().total_stake(), 15.0);
        store.remove_bet("g1-moneyline-home");
        assert_eq!(store.slip().mode(), SlipMode::Single);
        store.clear();
        assert!(store.slip().is_empty());
    }
}

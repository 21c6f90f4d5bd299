//! Deterministic identity for slip legs.
//!
//! A leg id is `{game}-{market}[-{sub_period}][-{prop_id}]-{selection}`. The same
//! inputs always produce the same id, which is what makes clicking a selection a
//! second time remove it instead of adding a duplicate.

use super::{BetLeg, BetRequest, Market, Selection};

pub const ID_SEPARATOR: &str = "-";

/// Build the id for a selection.
pub fn bet_id(
    game_id: &str,
    market: Market,
    sub_period: Option<&str>,
    prop_id: Option<&str>,
    selection: Selection,
) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(5);
    parts.push(game_id);
    parts.push(market.as_str());
    if let Some(sub) = sub_period {
        parts.push(sub);
    }
    if let Some(prop) = prop_id {
        parts.push(prop);
    }
    parts.push(selection.as_str());
    parts.join(ID_SEPARATOR)
}

/// True when `leg` and `req` are picks on the same position, whatever side each took.
///
/// Game lines share a position per `(game, market, sub_period)`; player props
/// per `(game, prop instance)`, so one prop can hold over or under but not both.
pub fn same_position(leg: &BetLeg, req: &BetRequest) -> bool {
    if leg.game.id != req.game.id || leg.market != req.market {
        return false;
    }
    if req.market.is_player_prop() {
        match (&leg.player_prop, &req.player_prop) {
            (Some(a), Some(b)) => a.prop_id == b.prop_id,
            _ => false,
        }
    } else {
        leg.sub_period == req.sub_period
    }
}

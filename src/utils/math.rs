/// Decimal price for a set of American odds (stake included).
///
/// Returns `None` for `0`, which is not a valid American price.
pub fn to_decimal_odds(american: i32) -> Option<f64> {
    if american > 0 {
        Some(american as f64 / 100.0 + 1.0)
    } else if american < 0 {
        Some(100.0 / (american as f64).abs() + 1.0)
    } else {
        None
    }
}

/// Convert a decimal price back to American odds, rounding to the nearest integer.
///
/// Prices at or above evens (2.0) map to positive odds. Returns `None` when the
/// price carries no profit (`decimal <= 1.0`) or is not finite.
pub fn decimal_to_american(decimal: f64) -> Option<i32> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return None;
    }
    let american = if decimal >= 2.0 {
        ((decimal - 1.0) * 100.0).round()
    } else {
        (-100.0 / (decimal - 1.0)).round()
    };
    Some(american as i32)
}

/// Profit (not stake + profit) returned by a winning bet of `stake` at `american` odds.
///
/// Stake is not clamped here; callers keep it non-negative. Zero odds yield zero.
pub fn payout(stake: f64, american: i32) -> f64 {
    if american > 0 {
        stake * (american as f64 / 100.0)
    } else if american < 0 {
        stake * (100.0 / (american as f64).abs())
    } else {
        0.0
    }
}

/// Combine several American prices into the single price of a parlay over all of them.
///
/// Decimal prices multiply, so the result does not depend on input order.
/// Returns `None` for an empty list or when any entry is zero.
pub fn combine_american_odds(odds: &[i32]) -> Option<i32> {
    if odds.is_empty() {
        return None;
    }
    let mut combined = 1.0;
    for &o in odds {
        combined *= to_decimal_odds(o)?;
    }
    decimal_to_american(combined)
}

/// Round a currency amount to whole cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render American odds with an explicit sign, e.g. `+150` or `-110`.
pub fn format_american(odds: i32) -> String {
    if odds > 0 {
        format!("+{odds}")
    } else {
        format!("{odds}")
    }
}

/// Render a spread/total line with an explicit sign for positive values.
pub fn format_line(line: f64) -> String {
    if line > 0.0 {
        format!("+{line}")
    } else {
        format!("{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_odds_basic() {
        assert_eq!(to_decimal_odds(150), Some(2.5));
        assert_eq!(to_decimal_odds(-200), Some(1.5));
        assert_eq!(to_decimal_odds(0), None);
    }

    #[test]
    fn payout_is_profit_only() {
        assert!((payout(10.0, -150) - 6.666_666).abs() < 1e-5);
        assert!((payout(10.0, 120) - 12.0).abs() < 1e-9);
        assert_eq!(payout(0.0, -110), 0.0);
        assert_eq!(payout(10.0, 0), 0.0);
        assert!(payout(-10.0, 100) < 0.0);
    }

    #[test]
    fn default_stake_moneyline_favourite() {
        let potential = 10.0 + payout(10.0, -150);
        assert_eq!(round_cents(potential), 16.67);
    }

    #[test]
    fn combine_two_legs() {
        // 2.2 * 1.90909 = 4.2 -> +320
        assert_eq!(combine_american_odds(&[120, -110]), Some(320));
    }

    #[test]
    fn combine_is_order_independent() {
        let pairs = [(-110, 150), (-300, -250), (450, 120), (-105, 101), (-1000, 2500)];
        for (a, b) in pairs {
            assert_eq!(
                combine_american_odds(&[a, b]),
                combine_american_odds(&[b, a]),
                "pair ({a}, {b})"
            );
        }
    }

    #[test]
    fn singleton_round_trips_within_one() {
        for o in [-10_000, -1000, -250, -150, -110, -101, 100, 101, 110, 150, 400, 2500] {
            let back = combine_american_odds(&[o]).expect("valid odds");
            assert!((back - o).abs() <= 1, "{o} came back as {back}");
        }
        // -100 and +100 are the same price.
        assert_eq!(combine_american_odds(&[-100]), Some(100));
    }

    #[test]
    fn combine_rejects_empty_and_zero() {
        assert_eq!(combine_american_odds(&[]), None);
        assert_eq!(combine_american_odds(&[-110, 0]), None);
    }

    #[test]
    fn short_parlay_stays_negative() {
        // 1.25 * 1.2 = 1.5 -> -200
        assert_eq!(combine_american_odds(&[-400, -500]), Some(-200));
    }

    #[test]
    fn formatting() {
        assert_eq!(format_american(150), "+150");
        assert_eq!(format_american(-110), "-110");
        assert_eq!(format_line(3.5), "+3.5");
        assert_eq!(format_line(-7.0), "-7");
    }
}

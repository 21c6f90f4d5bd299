use crate::types::SlipConfig;

/// House rules for stakes, derived from the `[slip]` config section.
#[derive(Clone, Debug, PartialEq)]
pub struct SlipParams {
    /// Stake given to a freshly added leg.
    pub default_stake: f64,
    /// Upper bound a stake edit is clamped to.
    pub max_stake: f64,
}

impl Default for SlipParams {
    fn default() -> Self {
        Self {
            default_stake: 10.0,
            max_stake: 10_000.0,
        }
    }
}

impl SlipParams {
    /// Stake a new leg starts at; never above the cap.
    pub fn opening_stake(&self) -> f64 {
        self.clamp(self.default_stake)
    }

    /// Clamp a stake to `[0, max_stake]`. Non-finite input becomes 0.
    pub fn clamp(&self, stake: f64) -> f64 {
        if stake.is_finite() {
            stake.min(self.max_stake).max(0.0)
        } else {
            0.0
        }
    }
}

impl From<&SlipConfig> for SlipParams {
    fn from(cfg: &SlipConfig) -> Self {
        let max_stake = cfg.max_stake.max(0.0);
        Self {
            default_stake: cfg.default_stake.clamp(0.0, max_stake),
            max_stake,
        }
    }
}

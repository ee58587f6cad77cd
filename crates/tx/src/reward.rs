// Path: crates/tx/src/reward.rs
//! The default staking reward curve.

use trellis_api::RewardCalculator;
use trellis_types::config::{RewardConfig, RATE_DENOMINATOR};

/// A reward curve scaled by remaining supply:
///
/// `reward = remaining × (weight / supply) × (period / mint_period) × rate`
///
/// with `rate` interpolated linearly between the configured minimum and
/// maximum consumption rates by staking period. All math is integer-only
/// and deterministic; the reward never exceeds the remaining supply.
#[derive(Clone, Copy, Debug)]
pub struct ScaledRewardCalculator {
    cfg: RewardConfig,
}

impl ScaledRewardCalculator {
    /// A calculator over one subnet's reward configuration.
    pub fn new(cfg: RewardConfig) -> Self {
        Self { cfg }
    }
}

impl RewardCalculator for ScaledRewardCalculator {
    fn calculate(&self, staking_period: u64, weight: u64, current_supply: u64) -> u64 {
        let cfg = &self.cfg;
        if cfg.mint_period == 0
            || current_supply == 0
            || current_supply >= cfg.supply_cap
            || weight == 0
        {
            return 0;
        }
        let remaining = u128::from(cfg.supply_cap - current_supply);
        let period = u128::from(staking_period.min(cfg.mint_period));
        let mint_period = u128::from(cfg.mint_period);

        let rate_span = cfg.max_consumption_rate.saturating_sub(cfg.min_consumption_rate);
        let rate = u128::from(cfg.min_consumption_rate)
            + u128::from(rate_span) * period / mint_period;

        let reward = remaining * u128::from(weight) / u128::from(current_supply) * period
            / mint_period
            * rate
            / u128::from(RATE_DENOMINATOR);
        reward.min(remaining) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RewardConfig {
        RewardConfig {
            max_consumption_rate: 120_000, // 12%
            min_consumption_rate: 100_000, // 10%
            mint_period: 365 * 24 * 60 * 60,
            supply_cap: 720_000_000,
        }
    }

    #[test]
    fn reward_scales_with_period_and_weight() {
        let calc = ScaledRewardCalculator::new(cfg());
        let year = 365 * 24 * 60 * 60;
        let full = calc.calculate(year, 1_000_000, 360_000_000);
        let half = calc.calculate(year / 2, 1_000_000, 360_000_000);
        let light = calc.calculate(year, 500_000, 360_000_000);
        assert!(full > 0);
        assert!(half < full);
        assert!(light < full);
    }

    #[test]
    fn no_reward_at_or_past_the_cap() {
        let calc = ScaledRewardCalculator::new(cfg());
        assert_eq!(calc.calculate(1_000, 1_000, 720_000_000), 0);
        assert_eq!(calc.calculate(1_000, 1_000, 800_000_000), 0);
    }

    #[test]
    fn reward_never_exceeds_remaining_supply() {
        let calc = ScaledRewardCalculator::new(RewardConfig {
            max_consumption_rate: RATE_DENOMINATOR,
            min_consumption_rate: RATE_DENOMINATOR,
            mint_period: 1,
            supply_cap: 1_000,
        });
        let reward = calc.calculate(u64::MAX, u64::MAX, 999);
        assert!(reward <= 1);
    }

    #[test]
    fn degenerate_inputs_yield_zero() {
        let calc = ScaledRewardCalculator::new(cfg());
        assert_eq!(calc.calculate(1_000, 0, 360_000_000), 0);
        assert_eq!(calc.calculate(1_000, 1_000, 0), 0);
    }
}

//! Risk throttle
//!
//! Skews the buy/sell order split by current position exposure so the grid
//! stops accumulating in the direction it is already loaded, and owns the
//! per-cycle cancellation cap. Pure functions over position and config.

use crate::config::GridConfig;
use crate::types::Position;

/// Hard cap on cancellations issued in a single cycle, bounding the blast
/// radius of any one reconciliation decision.
pub const MAX_CANCELS_PER_CYCLE: usize = 10;

/// Neither side drops below this share of the ladder outside of full
/// suppression.
pub const RATIO_CLAMP_MIN: f64 = 0.1;
pub const RATIO_CLAMP_MAX: f64 = 0.9;

/// Final buy/sell split for one cycle's ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideRatios {
    pub sell: f64,
    pub buy: f64,
}

impl SideRatios {
    /// Number of sell levels out of `total_orders`.
    pub fn sell_count(&self, total_orders: usize) -> usize {
        (total_orders as f64 * self.sell).round() as usize
    }

    /// Number of buy levels out of `total_orders`.
    pub fn buy_count(&self, total_orders: usize) -> usize {
        total_orders - self.sell_count(total_orders)
    }
}

fn clamp_ratio(r: f64) -> f64 {
    r.clamp(RATIO_CLAMP_MIN, RATIO_CLAMP_MAX)
}

/// Compute the buy/sell split given current exposure.
///
/// At or above `max_multiplier` the same-direction side is suppressed
/// entirely (0/1, bypassing the clamp) so the position cannot grow further.
/// Below that, the same-direction side's base ratio shrinks linearly with
/// the multiplier and the remainder goes to the other side; both final
/// ratios are then clamped to `[0.1, 0.9]`.
pub fn skew_ratios(position: &Position, config: &GridConfig) -> SideRatios {
    let base_sell = config.sell_ratio;
    let base_buy = 1.0 - base_sell;
    let multiplier = position.multiplier();

    if multiplier >= config.max_multiplier {
        if position.is_long() {
            return SideRatios {
                sell: 1.0,
                buy: 0.0,
            };
        }
        if position.is_short() {
            return SideRatios {
                sell: 0.0,
                buy: 1.0,
            };
        }
        // Flat position cannot reach the cap; fall through to the base split.
    }

    let (sell, buy) = if multiplier > 0.0 {
        let reduction_ratio = multiplier / config.max_multiplier;
        if position.is_long() {
            let buy = (base_buy - reduction_ratio * base_buy).max(0.0);
            (1.0 - buy, buy)
        } else {
            let sell = (base_sell - reduction_ratio * base_sell).max(0.0);
            (sell, 1.0 - sell)
        }
    } else {
        (base_sell, base_buy)
    };

    SideRatios {
        sell: clamp_ratio(sell),
        buy: clamp_ratio(buy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(sell_ratio: f64, max_multiplier: f64) -> GridConfig {
        GridConfig {
            sell_ratio,
            max_multiplier,
            ..GridConfig::default()
        }
    }

    fn position(quantity: f64, order_size: f64) -> Position {
        Position {
            quantity,
            order_size,
        }
    }

    #[test]
    fn test_flat_position_uses_base_split() {
        let ratios = skew_ratios(&position(0.0, 1.0), &config(0.5, 15.0));
        assert_relative_eq!(ratios.sell, 0.5);
        assert_relative_eq!(ratios.buy, 0.5);
    }

    #[test]
    fn test_full_suppression_long() {
        // Scenario from the design: qty=+9, order_size=1, max=8
        let ratios = skew_ratios(&position(9.0, 1.0), &config(0.5, 8.0));
        assert_eq!(ratios.buy, 0.0);
        assert_eq!(ratios.sell, 1.0);
        assert_eq!(ratios.sell_count(12), 12);
        assert_eq!(ratios.buy_count(12), 0);
    }

    #[test]
    fn test_full_suppression_short() {
        let ratios = skew_ratios(&position(-20.0, 1.0), &config(0.5, 15.0));
        assert_eq!(ratios.sell, 0.0);
        assert_eq!(ratios.buy, 1.0);
    }

    #[test]
    fn test_linear_reduction_long() {
        // multiplier 5 of 10 -> buy side loses half its base share
        let ratios = skew_ratios(&position(5.0, 1.0), &config(0.5, 10.0));
        assert_relative_eq!(ratios.buy, 0.25);
        assert_relative_eq!(ratios.sell, 0.75);
    }

    #[test]
    fn test_linear_reduction_short() {
        let ratios = skew_ratios(&position(-5.0, 1.0), &config(0.5, 10.0));
        assert_relative_eq!(ratios.sell, 0.25);
        assert_relative_eq!(ratios.buy, 0.75);
    }

    #[test]
    fn test_clamp_applies_below_cap() {
        // multiplier 9 of 10 would drive buy to 0.05; clamp holds it at 0.1
        let ratios = skew_ratios(&position(9.0, 1.0), &config(0.5, 10.0));
        assert_relative_eq!(ratios.buy, RATIO_CLAMP_MIN);
        assert_relative_eq!(ratios.sell, RATIO_CLAMP_MAX);
    }

    #[test]
    fn test_clamp_holds_for_any_partial_multiplier() {
        let cfg = config(0.5, 10.0);
        for qty in [0.5, 1.0, 3.0, 7.5, 9.9, -0.5, -4.0, -9.9] {
            let ratios = skew_ratios(&position(qty, 1.0), &cfg);
            assert!(ratios.buy >= RATIO_CLAMP_MIN && ratios.buy <= RATIO_CLAMP_MAX);
            assert!(ratios.sell >= RATIO_CLAMP_MIN && ratios.sell <= RATIO_CLAMP_MAX);
        }
    }

    #[test]
    fn test_counts_partition_total() {
        let ratios = skew_ratios(&position(3.0, 1.0), &config(0.55, 15.0));
        let total = 12;
        assert_eq!(ratios.sell_count(total) + ratios.buy_count(total), total);
    }
}

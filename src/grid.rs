//! Grid calculator
//!
//! Computes the ideal ladder of limit-order levels for the sliding price
//! window. Deterministic and pure: identical snapshot, ratios and config
//! always yield the identical ladder, which is what makes reconciliation
//! self-healing — every cycle recomputes from scratch and converges.

use crate::config::GridConfig;
use crate::risk::SideRatios;
use crate::types::{MarketSnapshot, PriceLevel, Side};

/// Ideal order ladder for one cycle, expressed in interval ticks.
///
/// `sells` ascend away from the ask, `buys` descend away from the bid.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    pub sells: Vec<i64>,
    pub buys: Vec<i64>,
    pub mid_price: f64,
}

impl Ladder {
    pub fn len(&self) -> usize {
        self.sells.len() + self.buys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() && self.buys.is_empty()
    }

    /// All levels as side-tagged price levels, sells first.
    pub fn levels(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.sells
            .iter()
            .map(|&t| PriceLevel::new(Side::Sell, t))
            .chain(self.buys.iter().map(|&t| PriceLevel::new(Side::Buy, t)))
    }

    /// Whether any ladder level (either side) sits on this tick.
    pub fn occupies(&self, tick: i64) -> bool {
        self.sells.contains(&tick) || self.buys.contains(&tick)
    }
}

/// Compute the ideal ladder from a fresh market snapshot.
///
/// Sell levels start one safe gap above the ask, buy levels one safe gap
/// below the bid, both snapped outward onto the interval grid. Each side
/// extends level by level until its target count is reached or the price
/// leaves the window (plus drift buffer); buys additionally stop at the
/// minimum valid price floor.
pub fn ideal_ladder(
    snapshot: &MarketSnapshot,
    ratios: SideRatios,
    config: &GridConfig,
) -> Ladder {
    let interval = config.price_interval;
    let mid_price = snapshot.mid_price();
    let half_window = mid_price * config.window_percent / 2.0;
    let upper_bound = mid_price + half_window + config.drift_buffer;
    let lower_bound = mid_price - half_window - config.drift_buffer;

    let sell_count = ratios.sell_count(config.total_orders);
    let buy_count = ratios.buy_count(config.total_orders);

    let sell_start = ((snapshot.ask_price + config.safe_gap) / interval).ceil() as i64;
    let mut sells = Vec::with_capacity(sell_count);
    for i in 0..sell_count as i64 {
        let tick = sell_start + i;
        if tick as f64 * interval > upper_bound {
            break;
        }
        sells.push(tick);
    }

    let buy_start = ((snapshot.bid_price - config.safe_gap) / interval).floor() as i64;
    let mut buys = Vec::with_capacity(buy_count);
    for i in 0..buy_count as i64 {
        let tick = buy_start - i;
        let price = tick as f64 * interval;
        if price < lower_bound || price < config.min_valid_price {
            break;
        }
        buys.push(tick);
    }

    Ladder {
        sells,
        buys,
        mid_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ask: f64, bid: f64) -> MarketSnapshot {
        MarketSnapshot {
            ask_price: ask,
            bid_price: bid,
            sell_levels: vec![],
            buy_levels: vec![],
        }
    }

    fn even_split() -> SideRatios {
        SideRatios {
            sell: 0.5,
            buy: 0.5,
        }
    }

    fn config() -> GridConfig {
        GridConfig {
            total_orders: 12,
            window_percent: 0.12,
            price_interval: 20.0,
            safe_gap: 20.0,
            drift_buffer: 2000.0,
            min_valid_price: 10_000.0,
            ..GridConfig::default()
        }
    }

    #[test]
    fn test_ladder_anchors_and_steps() {
        // ask=80100, bid=80080: sells start at 80120 stepping +20,
        // buys start at 80060 stepping -20
        let ladder = ideal_ladder(&snapshot(80100.0, 80080.0), even_split(), &config());
        let interval = 20.0;

        let sell_prices: Vec<f64> = ladder.sells.iter().map(|&t| t as f64 * interval).collect();
        assert_eq!(
            sell_prices,
            vec![80120.0, 80140.0, 80160.0, 80180.0, 80200.0, 80220.0]
        );

        let buy_prices: Vec<f64> = ladder.buys.iter().map(|&t| t as f64 * interval).collect();
        assert_eq!(
            buy_prices,
            vec![80060.0, 80040.0, 80020.0, 80000.0, 79980.0, 79960.0]
        );
    }

    #[test]
    fn test_deterministic() {
        let snap = snapshot(80100.0, 80080.0);
        let a = ideal_ladder(&snap, even_split(), &config());
        let b = ideal_ladder(&snap, even_split(), &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_price_snaps_to_interval() {
        let cfg = config();
        let ladder = ideal_ladder(&snapshot(80103.7, 80081.3), even_split(), &cfg);
        assert!(!ladder.is_empty());
        for level in ladder.levels() {
            let price = level.price(cfg.price_interval);
            let remainder = price % cfg.price_interval;
            assert!(
                remainder.abs() < 1e-9 || (cfg.price_interval - remainder).abs() < 1e-9,
                "price {} not on the {} grid",
                price,
                cfg.price_interval
            );
        }
    }

    #[test]
    fn test_sell_ladder_stops_at_window_edge() {
        let mut cfg = config();
        cfg.total_orders = 1000;
        cfg.drift_buffer = 0.0;
        let snap = snapshot(80100.0, 80080.0);
        let ladder = ideal_ladder(
            &snap,
            SideRatios {
                sell: 0.5,
                buy: 0.5,
            },
            &cfg,
        );
        let upper = snap.mid_price() * (1.0 + cfg.window_percent / 2.0);
        for &tick in &ladder.sells {
            assert!(tick as f64 * cfg.price_interval <= upper + 1e-9);
        }
        // The window, not the count, is what limited the side
        assert!(ladder.sells.len() < 500);
    }

    #[test]
    fn test_buy_ladder_respects_price_floor() {
        let mut cfg = config();
        cfg.min_valid_price = 79_990.0;
        let ladder = ideal_ladder(&snapshot(80100.0, 80080.0), even_split(), &cfg);
        let buy_prices: Vec<f64> = ladder
            .buys
            .iter()
            .map(|&t| t as f64 * cfg.price_interval)
            .collect();
        assert_eq!(buy_prices, vec![80060.0, 80040.0, 80020.0, 80000.0]);
    }

    #[test]
    fn test_suppressed_side_is_empty() {
        let ladder = ideal_ladder(
            &snapshot(80100.0, 80080.0),
            SideRatios {
                sell: 1.0,
                buy: 0.0,
            },
            &config(),
        );
        assert!(ladder.buys.is_empty());
        assert_eq!(ladder.sells.len(), 12);
    }

    #[test]
    fn test_ratio_rounds_to_counts() {
        let ladder = ideal_ladder(
            &snapshot(80100.0, 80080.0),
            SideRatios {
                sell: 0.55,
                buy: 0.45,
            },
            &config(),
        );
        // round(12 * 0.55) = 7 sells, 5 buys
        assert_eq!(ladder.sells.len(), 7);
        assert_eq!(ladder.buys.len(), 5);
    }
}

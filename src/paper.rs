//! Paper-trading adapter
//!
//! In-memory exchange simulation used by the `run` subcommand. Prices follow
//! a seeded random walk, resting orders fill when the touch crosses them,
//! and indicators are synthesized inside the ranging band so the grid
//! actually trades. Deterministic for a given seed.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::adapter::ExchangeAdapter;
use crate::types::{Indicators, MarketSnapshot, Position, Side};

/// Price resolution for the simulated book; one cent.
const CENTS: f64 = 100.0;

fn to_cents(price: f64) -> i64 {
    (price * CENTS).round() as i64
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / CENTS
}

/// Simulated exchange state.
pub struct PaperExchange {
    mid_cents: i64,
    spread_cents: i64,
    step_cents: i64,
    order_size: f64,
    quantity: f64,
    sells: BTreeSet<i64>,
    buys: BTreeSet<i64>,
    fills: u64,
    rng: u64,
}

impl PaperExchange {
    pub fn new(start_price: f64, order_size: f64, seed: u64) -> Self {
        PaperExchange {
            mid_cents: to_cents(start_price),
            spread_cents: to_cents(start_price * 0.00025).max(1),
            step_cents: to_cents(start_price * 0.0004).max(1),
            order_size,
            quantity: 0.0,
            sells: BTreeSet::new(),
            buys: BTreeSet::new(),
            fills: 0,
            rng: seed | 1,
        }
    }

    pub fn fills(&self) -> u64 {
        self.fills
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn resting_orders(&self) -> usize {
        self.sells.len() + self.buys.len()
    }

    fn next_unit(&mut self) -> f64 {
        // Linear congruential step; plenty for a price walk
        self.rng = self
            .rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng >> 11) as f64 / (1u64 << 53) as f64
    }

    fn advance_price(&mut self) {
        let u = self.next_unit();
        let step = ((u - 0.5) * 2.0 * self.step_cents as f64).round() as i64;
        self.mid_cents += step;
    }

    fn ask_cents(&self) -> i64 {
        self.mid_cents + self.spread_cents
    }

    fn bid_cents(&self) -> i64 {
        self.mid_cents - self.spread_cents
    }

    /// Fill any resting order the touch has crossed.
    fn settle_fills(&mut self) {
        let ask = self.ask_cents();
        let bid = self.bid_cents();

        let hit_sells: Vec<i64> = self.sells.iter().copied().filter(|&p| p <= ask).collect();
        for p in hit_sells {
            self.sells.remove(&p);
            self.quantity -= self.order_size;
            self.fills += 1;
            debug!("paper fill: sell @ {}", from_cents(p));
        }

        let hit_buys: Vec<i64> = self.buys.iter().copied().filter(|&p| p >= bid).collect();
        for p in hit_buys {
            self.buys.remove(&p);
            self.quantity += self.order_size;
            self.fills += 1;
            debug!("paper fill: buy @ {}", from_cents(p));
        }
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    async fn market_snapshot(&mut self) -> Result<MarketSnapshot> {
        self.advance_price();
        self.settle_fills();

        let mut sell_levels: Vec<f64> = self.sells.iter().map(|&p| from_cents(p)).collect();
        sell_levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mut buy_levels: Vec<f64> = self.buys.iter().map(|&p| from_cents(p)).collect();
        buy_levels.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        Ok(MarketSnapshot {
            ask_price: from_cents(self.ask_cents()),
            bid_price: from_cents(self.bid_cents()),
            sell_levels,
            buy_levels,
        })
    }

    async fn position(&mut self) -> Result<Position> {
        Ok(Position {
            quantity: self.quantity,
            order_size: self.order_size,
        })
    }

    async fn indicators(&mut self) -> Result<Option<Indicators>> {
        // Mild oscillation around the middle of the ranging band
        let u = self.next_unit();
        let v = self.next_unit();
        Ok(Some(Indicators {
            rsi: 45.0 + u * 10.0,
            adx: 12.0 + v * 8.0,
        }))
    }

    async fn place_order(&mut self, side: Side, price: f64) -> Result<()> {
        if !(price.is_finite() && price > 0.0) {
            bail!("invalid order price: {}", price);
        }
        let cents = to_cents(price);
        match side {
            Side::Sell => self.sells.insert(cents),
            Side::Buy => self.buys.insert(cents),
        };
        Ok(())
    }

    async fn cancel_order(&mut self, price: f64) -> Result<()> {
        let cents = to_cents(price);
        if self.sells.remove(&cents) || self.buys.remove(&cents) {
            Ok(())
        } else {
            bail!("no resting order at {}", price)
        }
    }

    async fn flatten_position(&mut self) -> Result<()> {
        if self.quantity != 0.0 {
            debug!("paper flatten: closing {:.4}", self.quantity);
        }
        self.quantity = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_orders_rest_until_crossed() {
        let mut paper = PaperExchange::new(80_000.0, 1.0, 42);
        // Far above the walk: stays resting
        paper.place_order(Side::Sell, 95_000.0).await.unwrap();
        for _ in 0..10 {
            paper.market_snapshot().await.unwrap();
        }
        assert_eq!(paper.resting_orders(), 1);
        assert_eq!(paper.fills(), 0);
    }

    #[tokio::test]
    async fn test_crossed_buy_fills_into_position() {
        let mut paper = PaperExchange::new(80_000.0, 1.0, 42);
        // At the mid: the next snapshot's bid is above it or the walk
        // crosses it almost immediately
        paper.place_order(Side::Buy, 80_000.0).await.unwrap();
        let mut filled = false;
        for _ in 0..50 {
            paper.market_snapshot().await.unwrap();
            if paper.fills() > 0 {
                filled = true;
                break;
            }
        }
        assert!(filled);
        assert_eq!(paper.quantity(), 1.0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_price_fails() {
        let mut paper = PaperExchange::new(80_000.0, 1.0, 42);
        assert!(paper.cancel_order(123.0).await.is_err());
    }

    #[tokio::test]
    async fn test_deterministic_for_seed() {
        let mut a = PaperExchange::new(80_000.0, 1.0, 7);
        let mut b = PaperExchange::new(80_000.0, 1.0, 7);
        for _ in 0..20 {
            let sa = a.market_snapshot().await.unwrap();
            let sb = b.market_snapshot().await.unwrap();
            assert_eq!(sa, sb);
        }
    }
}

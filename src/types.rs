//! Core data types used across the trading engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Floor applied to the per-order size before dividing, so a zero or
/// unreadable order size cannot blow up the position multiplier.
pub const ORDER_SIZE_EPSILON: f64 = 1e-4;

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Quantize a raw price onto the interval grid.
///
/// All order matching happens on integer tick keys rather than raw floats;
/// prices scraped back from the exchange rarely compare equal to computed
/// ones bit-for-bit.
pub fn tick_for(price: f64, interval: f64) -> i64 {
    (price / interval).round() as i64
}

/// A single grid level: side plus integer tick on the interval grid.
///
/// The concrete price is always `tick * interval`, an exact multiple of the
/// configured interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceLevel {
    pub side: Side,
    pub tick: i64,
}

impl PriceLevel {
    pub fn new(side: Side, tick: i64) -> Self {
        PriceLevel { side, tick }
    }

    /// Concrete price for this level.
    pub fn price(&self, interval: f64) -> f64 {
        self.tick as f64 * interval
    }
}

/// Market state read from the exchange adapter in one shot.
///
/// `sell_levels` are the resting sell prices (ascending) and `buy_levels`
/// the resting buy prices (descending), as the adapter reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub ask_price: f64,
    pub bid_price: f64,
    pub sell_levels: Vec<f64>,
    pub buy_levels: Vec<f64>,
}

impl MarketSnapshot {
    pub fn mid_price(&self) -> f64 {
        (self.ask_price + self.bid_price) / 2.0
    }

    /// True when the quoted prices are usable numbers.
    pub fn has_prices(&self) -> bool {
        self.ask_price.is_finite()
            && self.bid_price.is_finite()
            && self.ask_price > 0.0
            && self.bid_price > 0.0
    }
}

/// Resting orders quantized onto the interval grid.
///
/// Built fresh from every snapshot; this is the only representation the
/// reconciler ever compares against, so float-equality mismatches between
/// scraped and computed prices cannot occur.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookState {
    pub sells: BTreeSet<i64>,
    pub buys: BTreeSet<i64>,
}

impl BookState {
    pub fn from_snapshot(snapshot: &MarketSnapshot, interval: f64) -> Self {
        BookState {
            sells: snapshot
                .sell_levels
                .iter()
                .map(|&p| tick_for(p, interval))
                .collect(),
            buys: snapshot
                .buy_levels
                .iter()
                .map(|&p| tick_for(p, interval))
                .collect(),
        }
    }

    /// Total resting orders across both sides.
    pub fn total(&self) -> usize {
        self.sells.len() + self.buys.len()
    }

    pub fn contains(&self, level: &PriceLevel) -> bool {
        match level.side {
            Side::Sell => self.sells.contains(&level.tick),
            Side::Buy => self.buys.contains(&level.tick),
        }
    }
}

/// Current position as reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Signed quantity held; positive is long, negative is short.
    pub quantity: f64,
    /// Nominal size of a single grid order.
    pub order_size: f64,
}

impl Position {
    pub fn flat() -> Self {
        Position {
            quantity: 0.0,
            order_size: 0.0,
        }
    }

    /// Exposure expressed as a multiple of the per-order size.
    pub fn multiplier(&self) -> f64 {
        self.quantity.abs() / self.order_size.max(ORDER_SIZE_EPSILON)
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }
}

/// Indicator readings from the adapter's chart feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Relative Strength Index, 0-100
    pub rsi: f64,
    /// Average Directional Index, >= 0
    pub adx: f64,
}

impl Indicators {
    /// Scraped values can come back as NaN when the chart is mid-reload;
    /// treat those the same as missing data.
    pub fn is_valid(&self) -> bool {
        self.rsi.is_finite() && self.adx.is_finite()
    }
}

/// Bounded FIFO set of recently processed order keys.
///
/// Oldest entries are evicted once capacity is reached.
#[derive(Debug, Clone)]
pub struct ProcessedOrders {
    capacity: usize,
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl ProcessedOrders {
    pub fn new(capacity: usize) -> Self {
        ProcessedOrders {
            capacity: capacity.max(1),
            queue: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record a key; returns false if it was already present.
    pub fn record(&mut self, key: String) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        if self.queue.len() == self.capacity {
            if let Some(oldest) = self.queue.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.queue.push_back(key);
        true
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.seen.clear();
    }
}

/// Mutable per-process engine state, owned exclusively by the scheduler.
#[derive(Debug, Clone)]
pub struct CycleState {
    pub cycle_count: u64,
    pub last_order_time: Option<DateTime<Utc>>,
    pub processed: ProcessedOrders,
}

impl CycleState {
    pub fn new(history_capacity: usize) -> Self {
        CycleState {
            cycle_count: 0,
            last_order_time: None,
            processed: ProcessedOrders::new(history_capacity),
        }
    }
}

/// Snapshot of engine state for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub cycle_count: u64,
    pub last_order_time: Option<DateTime<Utc>>,
    pub processed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_quantization() {
        assert_eq!(tick_for(80120.0, 20.0), 4006);
        // Scraped prices with float noise land on the same tick
        assert_eq!(tick_for(80119.999999, 20.0), 4006);
        assert_eq!(tick_for(80120.000001, 20.0), 4006);
    }

    #[test]
    fn test_price_level_roundtrip() {
        let level = PriceLevel::new(Side::Sell, 4006);
        assert_eq!(level.price(20.0), 80120.0);
    }

    #[test]
    fn test_mid_price() {
        let snap = MarketSnapshot {
            ask_price: 80100.0,
            bid_price: 80080.0,
            sell_levels: vec![],
            buy_levels: vec![],
        };
        assert_eq!(snap.mid_price(), 80090.0);
        assert!(snap.has_prices());
    }

    #[test]
    fn test_book_state_quantizes_levels() {
        let snap = MarketSnapshot {
            ask_price: 80100.0,
            bid_price: 80080.0,
            sell_levels: vec![80120.00000001, 80140.0],
            buy_levels: vec![80060.0, 80039.99999999],
        };
        let book = BookState::from_snapshot(&snap, 20.0);
        assert!(book.sells.contains(&4006));
        assert!(book.sells.contains(&4007));
        assert!(book.buys.contains(&4003));
        assert!(book.buys.contains(&4002));
        assert_eq!(book.total(), 4);
    }

    #[test]
    fn test_position_multiplier_guards_zero_order_size() {
        let pos = Position {
            quantity: 1.0,
            order_size: 0.0,
        };
        assert!(pos.multiplier().is_finite());
        assert!(pos.multiplier() > 0.0);
    }

    #[test]
    fn test_processed_orders_evicts_oldest() {
        let mut processed = ProcessedOrders::new(3);
        assert!(processed.record("a".into()));
        assert!(processed.record("b".into()));
        assert!(processed.record("c".into()));
        assert!(!processed.record("a".into()));
        assert!(processed.record("d".into())); // evicts "a"
        assert_eq!(processed.len(), 3);
        assert!(processed.record("a".into()));
    }

    #[test]
    fn test_nan_indicators_invalid() {
        let ind = Indicators {
            rsi: f64::NAN,
            adx: 20.0,
        };
        assert!(!ind.is_valid());
    }
}

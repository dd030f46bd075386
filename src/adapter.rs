//! Exchange adapter contract
//!
//! The engine never talks to an exchange directly; everything goes through
//! this trait. The production implementation (UI automation against the
//! exchange frontend) lives outside this crate. Every call is fallible and
//! expected to be bounded by the implementation's own timeout policy.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Indicators, MarketSnapshot, Position, Side};

/// Boundary between the decision engine and the outside world.
///
/// Read failures are soft: the scheduler skips the cycle and retries on the
/// next one. A failed placement or cancellation is logged and the queue
/// continues; the next cycle's fresh reconciliation corrects any drift.
#[async_trait]
pub trait ExchangeAdapter: Send {
    /// Current ask/bid plus the resting orders on both sides.
    async fn market_snapshot(&mut self) -> Result<MarketSnapshot>;

    /// Signed position quantity and the nominal per-order size.
    async fn position(&mut self) -> Result<Position>;

    /// Latest RSI/ADX readings; `None` when the chart has no data.
    async fn indicators(&mut self) -> Result<Option<Indicators>>;

    /// Place a limit order at the given price.
    async fn place_order(&mut self, side: Side, price: f64) -> Result<()>;

    /// Cancel the resting order at the given price.
    async fn cancel_order(&mut self, price: f64) -> Result<()>;

    /// Close any open position at market.
    async fn flatten_position(&mut self) -> Result<()>;
}

//! Order reconciler
//!
//! Diffs the ideal ladder against the resting orders and produces the
//! minimal action set: which levels to place and which to cancel. Pure
//! functions; the scheduler executes the actions and re-reconciles from a
//! fresh snapshot afterwards.

use itertools::Itertools;

use crate::config::GridConfig;
use crate::grid::Ladder;
use crate::risk::MAX_CANCELS_PER_CYCLE;
use crate::types::{BookState, PriceLevel, Side};

/// Levels the ladder wants that are not yet resting, buys before sells in
/// the order they should be submitted.
pub fn plan_placements(ladder: &Ladder, book: &BookState) -> Vec<PriceLevel> {
    ladder
        .buys
        .iter()
        .filter(|t| !book.buys.contains(t))
        .map(|&t| PriceLevel::new(Side::Buy, t))
        .chain(
            ladder
                .sells
                .iter()
                .filter(|t| !book.sells.contains(t))
                .map(|&t| PriceLevel::new(Side::Sell, t)),
        )
        .collect()
}

/// Resting orders that have drifted out of the ideal ladder, farthest from
/// mid first, capped at [`MAX_CANCELS_PER_CYCLE`].
///
/// Cancellations are only considered once the book is oversized: total
/// resting beyond `total_orders`, or either side beyond its target count.
/// Orders within one interval of mid are exempt before the cap applies so
/// a level about to fill is never pulled.
pub fn plan_cancellations(
    ladder: &Ladder,
    book: &BookState,
    sell_target: usize,
    buy_target: usize,
    config: &GridConfig,
) -> Vec<PriceLevel> {
    let oversized = book.total() > config.total_orders
        || book.sells.len() > sell_target
        || book.buys.len() > buy_target;
    if !oversized {
        return Vec::new();
    }

    let interval = config.price_interval;
    let mid = ladder.mid_price;

    book.sells
        .iter()
        .map(|&t| PriceLevel::new(Side::Sell, t))
        .chain(book.buys.iter().map(|&t| PriceLevel::new(Side::Buy, t)))
        .filter(|level| !ladder.occupies(level.tick))
        .filter(|level| (level.price(interval) - mid).abs() > interval)
        .sorted_by(|a, b| {
            let da = (a.price(interval) - mid).abs();
            let db = (b.price(interval) - mid).abs();
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        })
        .take(MAX_CANCELS_PER_CYCLE)
        .collect()
}

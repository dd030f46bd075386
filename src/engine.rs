//! Cycle scheduler
//!
//! `GridEngine` drives one decision cycle per interval: regime gate, ladder
//! computation, cancellation pass, fresh re-read, placement pass. It is a
//! single cooperative loop — two cycles never overlap, adapter calls are
//! issued strictly sequentially with cooldowns between them, and every
//! per-cycle error is caught here so nothing propagates past a cycle
//! boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::adapter::ExchangeAdapter;
use crate::config::{Config, ConfigError};
use crate::grid::ideal_ladder;
use crate::reconcile::{plan_cancellations, plan_placements};
use crate::regime::{self, GateDecision, MarketRegime};
use crate::risk::skew_ratios;
use crate::types::{BookState, CycleState, EngineStatus, MarketSnapshot, PriceLevel};

/// Cloneable handle for stopping the engine from another task.
///
/// The flag is checked at the top of each cycle, never mid-cycle; an
/// in-flight cycle always completes before the loop exits.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Grid ran; counts of successful actions
    Traded { placed: usize, cancelled: usize },
    /// Gate forced the flatten path
    Flattened(MarketRegime),
    /// Market state unavailable or cycle errored; retried next interval
    Skipped,
}

/// Grid trading engine: owns the config, the adapter and all mutable
/// cycle state. Calculators receive state by reference and keep none of
/// their own, so a partially failed cycle self-corrects on the next one.
pub struct GridEngine<A> {
    config: Config,
    adapter: A,
    state: CycleState,
    running: Arc<AtomicBool>,
}

impl<A: ExchangeAdapter> GridEngine<A> {
    /// Construct the engine. Fails fast on invalid configuration; a
    /// misconfigured engine never runs.
    pub fn new(config: Config, adapter: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let history = config.timing.max_processed_orders;
        Ok(GridEngine {
            config,
            adapter,
            state: CycleState::new(history),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for stopping the run loop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.running.load(Ordering::SeqCst),
            cycle_count: self.state.cycle_count,
            last_order_time: self.state.last_order_time,
            processed_count: self.state.processed.len(),
        }
    }

    /// Reset the processed-order history, the last order time and the
    /// cycle counter.
    pub fn clear_history(&mut self) {
        self.state.processed.clear();
        self.state.last_order_time = None;
        self.state.cycle_count = 0;
        info!("order history cleared");
    }

    /// Give the adapter back, e.g. to inspect a simulation after a run.
    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// Run the cycle loop until stopped (or until `max_cycles`, when given).
    ///
    /// Self-paced: the next cycle starts `max(interval - cycle_duration,
    /// min_cycle_delay)` after the previous one began, so cycles never
    /// overlap and never spin faster than the floor.
    pub async fn run(&mut self, interval: Duration, max_cycles: Option<u64>) {
        self.running.store(true, Ordering::SeqCst);
        let floor = Duration::from_millis(self.config.timing.min_cycle_delay_ms);
        info!(
            "grid engine started: interval {:?}, pacing floor {:?}",
            interval, floor
        );

        while self.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.run_cycle().await;

            if let Some(max) = max_cycles {
                if self.state.cycle_count >= max {
                    info!("cycle limit {} reached, stopping", max);
                    break;
                }
            }

            let delay = interval.saturating_sub(started.elapsed()).max(floor);
            sleep(delay).await;
        }

        self.running.store(false, Ordering::SeqCst);
        info!("grid engine stopped after {} cycles", self.state.cycle_count);
    }

    /// Execute exactly one cycle. All errors are absorbed and logged; the
    /// caller only sees the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state.cycle_count += 1;
        let cycle = self.state.cycle_count;
        debug!("cycle {} starting", cycle);

        match self.try_cycle().await {
            Ok(outcome) => {
                match outcome {
                    CycleOutcome::Traded { placed, cancelled } => {
                        info!(
                            "cycle {}: placed {}, cancelled {}",
                            cycle, placed, cancelled
                        );
                    }
                    CycleOutcome::Flattened(regime) => {
                        warn!("cycle {}: flattened ({:?} regime)", cycle, regime);
                    }
                    CycleOutcome::Skipped => {
                        warn!("cycle {}: skipped", cycle);
                    }
                }
                outcome
            }
            Err(err) => {
                error!("cycle {} failed: {:#}", cycle, err);
                CycleOutcome::Skipped
            }
        }
    }

    /// Cancel every resting order, then close the position. Used by the
    /// gate's flatten path and exposed unconditionally on the control
    /// surface.
    pub async fn flatten_all(&mut self) -> Result<()> {
        match self.adapter.market_snapshot().await {
            Ok(snapshot) if snapshot.has_prices() => {
                let total = snapshot.sell_levels.len() + snapshot.buy_levels.len();
                if total > 0 {
                    info!("flattening: cancelling {} resting orders", total);
                }
                // Sells first, then buys, matching reconciliation order
                let prices: Vec<f64> = snapshot
                    .sell_levels
                    .iter()
                    .chain(snapshot.buy_levels.iter())
                    .copied()
                    .collect();
                for price in prices {
                    if let Err(err) = self.adapter.cancel_order(price).await {
                        error!("cancel failed @ {}: {:#}", price, err);
                    }
                    self.cancel_pause().await;
                }
            }
            Ok(_) => warn!("flatten: snapshot has no usable prices, skipping cancels"),
            Err(err) => warn!("flatten: snapshot unavailable ({:#}), skipping cancels", err),
        }

        self.adapter.flatten_position().await?;
        info!("position flattened");
        Ok(())
    }

    async fn try_cycle(&mut self) -> Result<CycleOutcome> {
        // 1. Regime gate. A failed indicator read is the same as no data:
        // when uncertain, de-risk.
        let indicators = match self.adapter.indicators().await {
            Ok(ind) => ind,
            Err(err) => {
                warn!("indicator read failed: {:#}", err);
                None
            }
        };
        let verdict = regime::evaluate(indicators.as_ref(), &self.config.grid);
        debug!(
            "gate: {:?} -> {:?} ({:?})",
            verdict.regime, verdict.decision, indicators
        );
        if verdict.decision == GateDecision::Flatten {
            self.flatten_all().await?;
            return Ok(CycleOutcome::Flattened(verdict.regime));
        }

        // 2. Market and position reads; soft failures skip the cycle.
        let snapshot = match self.read_snapshot().await {
            Some(s) => s,
            None => return Ok(CycleOutcome::Skipped),
        };
        let position = match self.adapter.position().await {
            Ok(p) => p,
            Err(err) => {
                warn!("position unavailable, skipping cycle: {:#}", err);
                return Ok(CycleOutcome::Skipped);
            }
        };

        let ratios = skew_ratios(&position, &self.config.grid);
        let total = self.config.grid.total_orders;
        let sell_target = ratios.sell_count(total);
        let buy_target = ratios.buy_count(total);
        debug!(
            "position {:.4} ({:.1}x) -> split {}/{} sell/buy",
            position.quantity,
            position.multiplier(),
            sell_target,
            buy_target
        );

        // 3. Cancellation pass against the first snapshot.
        let ladder = ideal_ladder(&snapshot, ratios, &self.config.grid);
        let book = BookState::from_snapshot(&snapshot, self.config.grid.price_interval);
        let cancels = plan_cancellations(&ladder, &book, sell_target, buy_target, &self.config.grid);
        let mut cancelled = 0usize;
        for level in &cancels {
            let price = level.price(self.config.grid.price_interval);
            match self.adapter.cancel_order(price).await {
                Ok(()) => {
                    cancelled += 1;
                    debug!("cancelled {} @ {}", level.side, price);
                }
                Err(err) => error!("cancel failed {} @ {}: {:#}", level.side, price, err),
            }
            self.cancel_pause().await;
        }

        // 4. Placement pass from a fresh snapshot — the post-cancel book,
        // never the stale one, decides what to place.
        let snapshot = match self.read_snapshot().await {
            Some(s) => s,
            None => {
                warn!("post-cancel snapshot unavailable, deferring placements");
                return Ok(CycleOutcome::Traded {
                    placed: 0,
                    cancelled,
                });
            }
        };
        let ladder = ideal_ladder(&snapshot, ratios, &self.config.grid);
        let book = BookState::from_snapshot(&snapshot, self.config.grid.price_interval);
        let placements = plan_placements(&ladder, &book);

        let mut placed = 0usize;
        for level in &placements {
            let price = level.price(self.config.grid.price_interval);
            match self.adapter.place_order(level.side, price).await {
                Ok(()) => {
                    placed += 1;
                    self.state.last_order_time = Some(Utc::now());
                    self.state.processed.record(order_key(level));
                    debug!("placed {} @ {}", level.side, price);
                    sleep(Duration::from_millis(self.config.timing.order_cooldown_ms)).await;
                }
                // No retry within the cycle; the next reconciliation
                // corrects whatever this leaves behind.
                Err(err) => error!("placement failed {} @ {}: {:#}", level.side, price, err),
            }
        }

        Ok(CycleOutcome::Traded { placed, cancelled })
    }

    async fn read_snapshot(&mut self) -> Option<MarketSnapshot> {
        match self.adapter.market_snapshot().await {
            Ok(s) if s.has_prices() => Some(s),
            Ok(_) => {
                warn!("snapshot has no usable prices");
                None
            }
            Err(err) => {
                warn!("snapshot unavailable: {:#}", err);
                None
            }
        }
    }

    async fn cancel_pause(&self) {
        sleep(Duration::from_millis(self.config.timing.cancel_delay_ms)).await;
    }
}

fn order_key(level: &PriceLevel) -> String {
    format!("{}@{}", level.side, level.tick)
}

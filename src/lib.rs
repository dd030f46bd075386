//! Sliding-Window Grid Trading Engine
//!
//! An automated grid-trading engine for a single asset pair. Each cycle it
//! gates on market regime, computes the ideal ladder of limit orders for a
//! sliding price window, reconciles it against resting orders and issues
//! the minimal cancel/place action set through an exchange adapter.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod grid;
pub mod paper;
pub mod reconcile;
pub mod regime;
pub mod risk;
pub mod types;

pub use adapter::ExchangeAdapter;
pub use config::{Config, GridConfig, TimingConfig};
pub use engine::{CycleOutcome, GridEngine, StopHandle};
pub use types::*;

//! Configuration management
//!
//! Handles loading and validation of the JSON configuration file. The
//! configuration is assembled once at startup and passed by reference into
//! every calculator; nothing mutates it afterwards. Invalid configuration is
//! fatal: the engine refuses to construct.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration validation errors. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sell_ratio ({0}) must be strictly between 0 and 1")]
    RatioOutOfRange(f64),

    #[error("price_interval ({0}) must be > 0")]
    NonPositiveInterval(f64),

    #[error("total_orders must be > 0")]
    ZeroTotalOrders,

    #[error("window_percent ({0}) must be > 0")]
    NonPositiveWindow(f64),

    #[error("max_multiplier ({0}) must be > 0")]
    NonPositiveMaxMultiplier(f64),

    #[error("RSI bounds invalid: min={min}, max={max} (need 0 <= min < max <= 100)")]
    RsiBoundsInvalid { min: f64, max: f64 },

    #[error("ADX thresholds invalid: trend={trend}, strong={strong} (need 0 < trend < strong)")]
    AdxThresholdsInvalid { trend: f64, strong: f64 },

    #[error("{name} ({value}) must be >= 0")]
    NegativeValue { name: &'static str, value: f64 },

    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.timing.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            grid: GridConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Grid strategy parameters.
///
/// Drives ladder geometry, regime gating thresholds and the position-based
/// ratio skew.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Target number of resting orders across both sides
    pub total_orders: usize,
    /// Fraction of mid price spanned by the sliding window
    pub window_percent: f64,
    /// Base fraction of orders placed on the sell side
    pub sell_ratio: f64,
    /// Grid spacing; every level is an exact multiple of this
    pub price_interval: f64,
    /// Offset from the touch so fresh orders do not fill instantly
    pub safe_gap: f64,
    /// Tolerance beyond the window before ladder extension stops
    pub drift_buffer: f64,
    /// Floor below which no buy order is ever placed
    pub min_valid_price: f64,
    /// Position cap as a multiple of the per-order size
    pub max_multiplier: f64,
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub adx_trend_threshold: f64,
    pub adx_strong_trend: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            total_orders: 12,
            window_percent: 0.12,
            sell_ratio: 0.5,
            price_interval: 20.0,
            safe_gap: 20.0,
            drift_buffer: 2000.0,
            min_valid_price: 10_000.0,
            max_multiplier: 15.0,
            rsi_min: 35.0,
            rsi_max: 65.0,
            adx_trend_threshold: 25.0,
            adx_strong_trend: 30.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sell_ratio > 0.0 && self.sell_ratio < 1.0) {
            return Err(ConfigError::RatioOutOfRange(self.sell_ratio));
        }
        if !(self.price_interval > 0.0) {
            return Err(ConfigError::NonPositiveInterval(self.price_interval));
        }
        if self.total_orders == 0 {
            return Err(ConfigError::ZeroTotalOrders);
        }
        if !(self.window_percent > 0.0) {
            return Err(ConfigError::NonPositiveWindow(self.window_percent));
        }
        if !(self.max_multiplier > 0.0) {
            return Err(ConfigError::NonPositiveMaxMultiplier(self.max_multiplier));
        }
        if !(self.rsi_min >= 0.0 && self.rsi_min < self.rsi_max && self.rsi_max <= 100.0) {
            return Err(ConfigError::RsiBoundsInvalid {
                min: self.rsi_min,
                max: self.rsi_max,
            });
        }
        if !(self.adx_trend_threshold > 0.0 && self.adx_trend_threshold < self.adx_strong_trend) {
            return Err(ConfigError::AdxThresholdsInvalid {
                trend: self.adx_trend_threshold,
                strong: self.adx_strong_trend,
            });
        }
        for (name, value) in [
            ("safe_gap", self.safe_gap),
            ("drift_buffer", self.drift_buffer),
            ("min_valid_price", self.min_valid_price),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeValue { name, value });
            }
        }
        Ok(())
    }
}

/// Cycle pacing and cooldown parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Target wall-clock interval between cycle starts
    pub monitor_interval_ms: u64,
    /// Cooldown after each successful placement
    pub order_cooldown_ms: u64,
    /// Settling delay after each cancellation
    pub cancel_delay_ms: u64,
    /// Pacing floor: cycles never run closer together than this
    pub min_cycle_delay_ms: u64,
    /// Capacity of the processed-order history
    pub max_processed_orders: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            monitor_interval_ms: 3000,
            order_cooldown_ms: 1500,
            cancel_delay_ms: 500,
            min_cycle_delay_ms: 1000,
            max_processed_orders: 100,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("monitor_interval_ms", self.monitor_interval_ms),
            ("order_cooldown_ms", self.order_cooldown_ms),
            ("cancel_delay_ms", self.cancel_delay_ms),
            ("min_cycle_delay_ms", self.min_cycle_delay_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.max_processed_orders == 0 {
            return Err(ConfigError::ZeroDuration("max_processed_orders"));
        }
        Ok(())
    }
}

//! Market regime gate
//!
//! Classifies the market from RSI/ADX readings and decides whether grid
//! trading may proceed this cycle. Evaluated fresh every cycle with no
//! memory of the previous verdict. The fail-safe default is to de-risk:
//! missing or malformed indicators force the flatten path.

use crate::config::GridConfig;
use crate::types::Indicators;

/// Extra RSI tolerance allowed on each side of the band while the market
/// is trending but not strongly so.
const TREND_RSI_TOLERANCE: f64 = 5.0;

/// Market classification derived from the indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    /// ADX below the trend threshold; ideal for grid trading
    Ranging,
    /// ADX between the trend and strong-trend thresholds
    Trending,
    /// ADX above the strong-trend threshold; grid trading is unsafe
    StrongTrend,
    /// Indicators absent or unreadable
    NoData,
}

/// What the gate tells the scheduler to do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Conditions favor range-bound trading; run the grid
    Allow,
    /// Cancel all resting orders, close the position, skip the cycle
    Flatten,
}

/// Regime plus decision, as one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateVerdict {
    pub regime: MarketRegime,
    pub decision: GateDecision,
}

/// Evaluate the gate for one cycle.
pub fn evaluate(indicators: Option<&Indicators>, config: &GridConfig) -> GateVerdict {
    let ind = match indicators {
        Some(ind) if ind.is_valid() => ind,
        _ => {
            return GateVerdict {
                regime: MarketRegime::NoData,
                decision: GateDecision::Flatten,
            }
        }
    };

    if ind.adx > config.adx_strong_trend {
        return GateVerdict {
            regime: MarketRegime::StrongTrend,
            decision: GateDecision::Flatten,
        };
    }

    if ind.adx > config.adx_trend_threshold {
        // Trending but tradeable: the RSI band widens by the tolerance,
        // extreme readings still flatten.
        let decision = if ind.rsi < config.rsi_min - TREND_RSI_TOLERANCE
            || ind.rsi > config.rsi_max + TREND_RSI_TOLERANCE
        {
            GateDecision::Flatten
        } else {
            GateDecision::Allow
        };
        return GateVerdict {
            regime: MarketRegime::Trending,
            decision,
        };
    }

    let decision = if ind.rsi < config.rsi_min || ind.rsi > config.rsi_max {
        GateDecision::Flatten
    } else {
        GateDecision::Allow
    };
    GateVerdict {
        regime: MarketRegime::Ranging,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GridConfig {
        GridConfig::default() // RSI 35-65, ADX trend 25, strong 30
    }

    fn ind(rsi: f64, adx: f64) -> Indicators {
        Indicators { rsi, adx }
    }

    #[test]
    fn test_no_data_flattens() {
        let v = evaluate(None, &config());
        assert_eq!(v.regime, MarketRegime::NoData);
        assert_eq!(v.decision, GateDecision::Flatten);
    }

    #[test]
    fn test_nan_indicators_flatten() {
        let v = evaluate(Some(&ind(f64::NAN, 20.0)), &config());
        assert_eq!(v.regime, MarketRegime::NoData);
        assert_eq!(v.decision, GateDecision::Flatten);
    }

    #[test]
    fn test_strong_trend_flattens() {
        let v = evaluate(Some(&ind(50.0, 35.0)), &config());
        assert_eq!(v.regime, MarketRegime::StrongTrend);
        assert_eq!(v.decision, GateDecision::Flatten);
    }

    #[test]
    fn test_ranging_rsi_in_band_allows() {
        let v = evaluate(Some(&ind(50.0, 20.0)), &config());
        assert_eq!(v.regime, MarketRegime::Ranging);
        assert_eq!(v.decision, GateDecision::Allow);
    }

    #[test]
    fn test_ranging_rsi_out_of_band_flattens() {
        // Scenario from the design: rsi=70, adx=20 with bounds 35-65/25
        let v = evaluate(Some(&ind(70.0, 20.0)), &config());
        assert_eq!(v.regime, MarketRegime::Ranging);
        assert_eq!(v.decision, GateDecision::Flatten);
    }

    #[test]
    fn test_trending_widened_band_allows() {
        // RSI 68 is outside the normal band but inside the widened one
        let v = evaluate(Some(&ind(68.0, 27.0)), &config());
        assert_eq!(v.regime, MarketRegime::Trending);
        assert_eq!(v.decision, GateDecision::Allow);
    }

    #[test]
    fn test_trending_extreme_rsi_flattens() {
        let v = evaluate(Some(&ind(72.0, 27.0)), &config());
        assert_eq!(v.regime, MarketRegime::Trending);
        assert_eq!(v.decision, GateDecision::Flatten);

        let v = evaluate(Some(&ind(28.0, 27.0)), &config());
        assert_eq!(v.decision, GateDecision::Flatten);
    }

    #[test]
    fn test_adx_exactly_at_strong_threshold_is_trending() {
        let v = evaluate(Some(&ind(50.0, 30.0)), &config());
        assert_eq!(v.regime, MarketRegime::Trending);
        assert_eq!(v.decision, GateDecision::Allow);
    }
}

//! Close-vs-average crossover detection.
//!
//! Fires CrossAbove when the close moves from at-or-below the average to
//! strictly above it, CrossBelow when it moves from at-or-above to strictly
//! below. A close exactly on the average never fires by itself, so a flat
//! day sitting on the line cannot produce a double signal.

use serde::{Deserialize, Serialize};

use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    None,
    CrossAbove,
    CrossBelow,
}

/// Classify one bar from its own and the previous bar's close/average pair.
pub fn classify(prev_close: f64, prev_ma: f64, close: f64, ma: f64) -> Signal {
    // Cross above: previous close <= MA, current close > MA.
    if prev_close <= prev_ma && close > ma {
        return Signal::CrossAbove;
    }
    // Cross below: previous close >= MA, current close < MA.
    if prev_close >= prev_ma && close < ma {
        return Signal::CrossBelow;
    }
    Signal::None
}

/// Per-bar signals aligned with `bars`.
///
/// `ma` must be aligned 1:1 with `bars`. Bar 0 and any bar whose own or
/// previous average is undefined get `Signal::None`.
pub fn detect_signals(bars: &[PriceBar], ma: &[Option<f64>]) -> Vec<Signal> {
    debug_assert_eq!(bars.len(), ma.len(), "moving average must align with bars");

    let n = bars.len().min(ma.len());
    let mut signals = vec![Signal::None; bars.len()];

    for i in 1..n {
        if let (Some(prev_ma), Some(cur_ma)) = (ma[i - 1], ma[i]) {
            signals[i] = classify(bars[i - 1].close, prev_ma, bars[i].close, cur_ma);
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn cross_below_from_equality() {
        // close == MA yesterday, below today
        assert_eq!(classify(425.0, 425.0, 420.0, 425.0), Signal::CrossBelow);
    }

    #[test]
    fn cross_above_from_equality() {
        assert_eq!(classify(100.0, 100.0, 101.0, 100.0), Signal::CrossAbove);
    }

    #[test]
    fn touching_the_average_is_not_a_cross() {
        // below yesterday, exactly on the line today
        assert_eq!(classify(412.0, 425.0, 415.0, 415.0), Signal::None);
        // above yesterday, exactly on the line today
        assert_eq!(classify(110.0, 100.0, 100.0, 100.0), Signal::None);
        // flat on the line both days
        assert_eq!(classify(100.0, 100.0, 100.0, 100.0), Signal::None);
    }

    #[test]
    fn same_side_is_none() {
        assert_eq!(classify(90.0, 100.0, 95.0, 100.0), Signal::None);
        assert_eq!(classify(110.0, 100.0, 105.0, 100.0), Signal::None);
    }

    #[test]
    fn undefined_average_yields_none() {
        let bars = make_bars(&[10.0, 12.0, 8.0, 12.0]);
        let ma = vec![None, None, Some(10.0), Some(10.0)];
        let signals = detect_signals(&bars, &ma);
        // bar 2: prev MA undefined → None even though 8 < 10
        assert_eq!(signals, vec![Signal::None, Signal::None, Signal::None, Signal::CrossAbove]);
    }

    #[test]
    fn tie_then_move_fires_once() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 99.0, 99.0]);
        let ma = vec![Some(100.0); 5];
        let signals = detect_signals(&bars, &ma);
        assert_eq!(
            signals,
            vec![Signal::None, Signal::None, Signal::None, Signal::CrossBelow, Signal::None]
        );
    }
}

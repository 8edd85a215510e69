//! Equity curve reconstruction from a trade ledger.
//!
//! Valuation follows the position held *on* each bar: a trade changes the
//! holding from its execution bar onward, so the signal bar is still valued
//! with the old position.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Portfolio, PositionSide, PriceBar, Trade, TradeSide};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Holdings at the start of bar 0.
///
/// Long starts buy at bar 0's close, so bar 0 is valued at exactly the
/// invested amount (up to rounding).
pub fn opening_portfolio(side: PositionSide, initial_cash: f64, first_close: f64) -> Portfolio {
    let mut portfolio = Portfolio::all_cash(initial_cash);
    if side == PositionSide::Long {
        portfolio.buy_all(first_close);
    }
    portfolio
}

/// Replay filled trades over `bars` and value the portfolio at every close.
///
/// Pending trades are ignored. Uses the same fill arithmetic as the engine,
/// so replaying a run's ledger reproduces its curve exactly.
pub fn build_equity_curve(
    bars: &[PriceBar],
    trades: &[Trade],
    initial_side: PositionSide,
    initial_cash: f64,
) -> Vec<EquityPoint> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };

    let mut portfolio = opening_portfolio(initial_side, initial_cash, first.close);
    let mut side = initial_side;
    let mut fills = trades.iter().filter(|t| t.is_filled()).peekable();
    let mut curve = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        while let Some(trade) = fills.next_if(|t| t.execution_bar == Some(i)) {
            let price = trade.execution_price.unwrap_or(bar.open);
            match trade.side {
                TradeSide::Buy => portfolio.buy_all(price),
                TradeSide::Sell => portfolio.sell_all(price),
            }
            side = trade.resulting_side();
        }

        curve.push(EquityPoint {
            date: bar.date,
            value: portfolio.value(side, bar.close),
        });
    }

    curve
}

/// Buy-and-hold benchmark: fully invested at bar 0's close, never trades.
pub fn benchmark_curve(bars: &[PriceBar], initial_cash: f64) -> Vec<EquityPoint> {
    build_equity_curve(bars, &[], PositionSide::Long, initial_cash)
}

/// Values only, for metric functions.
pub fn values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FillStatus, TradeReason};
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn filled(side: TradeSide, signal_bar: usize, bars: &[PriceBar]) -> Trade {
        let exec = signal_bar + 1;
        Trade {
            side,
            reason: TradeReason::CrossBelow,
            status: FillStatus::Filled,
            signal_bar,
            signal_date: bars[signal_bar].date,
            execution_bar: Some(exec),
            execution_date: Some(bars[exec].date),
            execution_price: Some(bars[exec].open),
            shares_after: 0.0,
            cash_after: 0.0,
        }
    }

    #[test]
    fn no_trades_long_tracks_price() {
        let bars = make_bars(&[100.0, 110.0, 90.0]);
        let curve = build_equity_curve(&bars, &[], PositionSide::Long, 1_000.0);
        assert_eq!(curve.len(), 3);
        assert_approx(curve[0].value, 1_000.0, DEFAULT_EPSILON);
        assert_approx(curve[1].value, 1_100.0, DEFAULT_EPSILON);
        assert_approx(curve[2].value, 900.0, DEFAULT_EPSILON);
    }

    #[test]
    fn no_trades_cash_is_flat() {
        let bars = make_bars(&[100.0, 110.0, 90.0]);
        let curve = build_equity_curve(&bars, &[], PositionSide::Cash, 1_000.0);
        assert!(curve.iter().all(|p| p.value == 1_000.0));
    }

    #[test]
    fn sell_applies_from_execution_bar_not_signal_bar() {
        // opens are previous closes: bar 2 opens at 110
        let bars = make_bars(&[100.0, 110.0, 90.0, 80.0]);
        let trades = vec![filled(TradeSide::Sell, 1, &bars)];
        let curve = build_equity_curve(&bars, &trades, PositionSide::Long, 1_000.0);

        // signal bar still long
        assert_approx(curve[1].value, 1_100.0, DEFAULT_EPSILON);
        // sold at bar 2 open (110) → 1100 cash from then on
        assert_approx(curve[2].value, 1_100.0, DEFAULT_EPSILON);
        assert_approx(curve[3].value, 1_100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn pending_trades_do_not_move_the_curve() {
        let bars = make_bars(&[100.0, 110.0]);
        let mut pending = filled(TradeSide::Sell, 0, &bars);
        pending.status = FillStatus::Pending;
        pending.execution_bar = None;
        let curve = build_equity_curve(&bars, &[pending], PositionSide::Long, 1_000.0);
        assert_approx(curve[1].value, 1_100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn benchmark_is_buy_and_hold() {
        let bars = make_bars(&[50.0, 75.0, 100.0]);
        let curve = benchmark_curve(&bars, 500.0);
        assert_approx(curve[2].value, 1_000.0, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_series_gives_empty_curve() {
        assert!(build_equity_curve(&[], &[], PositionSide::Long, 1.0).is_empty());
    }
}

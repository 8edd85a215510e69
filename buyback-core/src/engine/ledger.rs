//! Trade ledger: append-only record of fills plus at most one trailing
//! pending order.

use serde::{Deserialize, Serialize};

use crate::domain::{FillStatus, Portfolio, PriceBar, Trade, TradeSide};

use super::state::ScheduledOrder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an order filled at `bar`'s open. `portfolio` is the holding
    /// after the fill.
    pub fn record_fill(
        &mut self,
        order: &ScheduledOrder,
        bar_index: usize,
        bar: &PriceBar,
        portfolio: &Portfolio,
    ) {
        debug_assert!(
            self.last_filled_side() != Some(order.side),
            "sides must alternate: two {:?} fills in a row",
            order.side
        );
        debug_assert!(!self.has_pending(), "no fills may follow a pending order");

        self.trades.push(Trade {
            side: order.side,
            reason: order.reason,
            status: FillStatus::Filled,
            signal_bar: order.signal_bar,
            signal_date: order.signal_date,
            execution_bar: Some(bar_index),
            execution_date: Some(bar.date),
            execution_price: Some(bar.open),
            shares_after: portfolio.shares,
            cash_after: portfolio.cash,
        });
    }

    /// Record an order that never got a next bar to fill on.
    pub fn record_pending(&mut self, order: &ScheduledOrder, portfolio: &Portfolio) {
        self.trades.push(Trade {
            side: order.side,
            reason: order.reason,
            status: FillStatus::Pending,
            signal_bar: order.signal_bar,
            signal_date: order.signal_date,
            execution_bar: None,
            execution_date: None,
            execution_price: None,
            shares_after: portfolio.shares,
            cash_after: portfolio.cash,
        });
    }

    /// All entries in order, pending last.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn filled(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_filled())
    }

    pub fn pending(&self) -> Option<&Trade> {
        self.trades.iter().find(|t| !t.is_filled())
    }

    pub fn has_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Executed trades only.
    pub fn trade_count(&self) -> usize {
        self.filled().count()
    }

    pub fn last_filled_side(&self) -> Option<TradeSide> {
        self.filled().last().map(|t| t.side)
    }

    /// Share count after each executed buy.
    pub fn shares_after_buys(&self) -> Vec<f64> {
        self.filled()
            .filter(|t| t.side == TradeSide::Buy)
            .map(|t| t.shares_after)
            .collect()
    }

    /// Cash balance after each executed sell.
    pub fn cash_after_sells(&self) -> Vec<f64> {
        self.filled()
            .filter(|t| t.side == TradeSide::Sell)
            .map(|t| t.cash_after)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeReason;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn order(side: TradeSide, reason: TradeReason, signal_bar: usize) -> ScheduledOrder {
        ScheduledOrder {
            side,
            reason,
            signal_bar,
            signal_date: date(2 + signal_bar as u32),
        }
    }

    #[test]
    fn fills_and_pending_are_counted_separately() {
        let mut ledger = TradeLedger::new();
        let mut portfolio = Portfolio::all_cash(1_000.0);
        portfolio.buy_all(100.0);

        let bar = PriceBar::new(date(4), 110.0, 111.0);
        portfolio.sell_all(bar.open);
        ledger.record_fill(&order(TradeSide::Sell, TradeReason::CrossBelow, 1), 2, &bar, &portfolio);

        let bar = PriceBar::new(date(8), 105.0, 104.0);
        portfolio.buy_all(bar.open);
        ledger.record_fill(&order(TradeSide::Buy, TradeReason::AutomaticBuyback, 5), 6, &bar, &portfolio);

        ledger.record_pending(&order(TradeSide::Sell, TradeReason::CrossBelow, 9), &portfolio);

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.trade_count(), 2);
        assert!(ledger.has_pending());
        assert_eq!(ledger.pending().unwrap().signal_bar, 9);
        assert_eq!(ledger.last_filled_side(), Some(TradeSide::Buy));

        assert_eq!(ledger.cash_after_sells(), vec![1_100.0]);
        let shares = ledger.shares_after_buys();
        assert_eq!(shares.len(), 1);
        assert!((shares[0] - 1_100.0 / 105.0).abs() < 1e-12);
    }

    #[test]
    fn fill_records_next_bar_open() {
        let mut ledger = TradeLedger::new();
        let mut portfolio = Portfolio::all_cash(500.0);
        portfolio.buy_all(50.0);
        let bar = PriceBar::new(date(3), 48.0, 47.0);
        portfolio.sell_all(bar.open);
        ledger.record_fill(&order(TradeSide::Sell, TradeReason::CrossBelow, 0), 1, &bar, &portfolio);

        let trade = &ledger.trades()[0];
        assert_eq!(trade.execution_bar, Some(trade.signal_bar + 1));
        assert_eq!(trade.execution_price, Some(48.0));
        assert_eq!(trade.execution_date, Some(date(3)));
        assert_eq!(trade.cash_after, 480.0);
    }
}

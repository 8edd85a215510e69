//! Trade: one executed (or still pending) position transition.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Position the portfolio ends up in once this trade fills.
    pub fn resulting_side(&self) -> PositionSide {
        match self {
            TradeSide::Buy => PositionSide::Long,
            TradeSide::Sell => PositionSide::Cash,
        }
    }
}

/// Why the trade was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeReason {
    /// Close crossed below the moving average while long.
    CrossBelow,
    /// Close crossed above the moving average before the wait budget ran out.
    EarlyBuyback,
    /// Wait budget exhausted; re-entry regardless of price vs average.
    AutomaticBuyback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    Filled,
    /// Scheduled on the last bar; there is no next open to fill at.
    Pending,
}

/// A ledger entry.
///
/// For filled trades `execution_bar == signal_bar + 1` and the price is that
/// bar's open. Pending trades carry no execution fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: TradeSide,
    pub reason: TradeReason,
    pub status: FillStatus,

    // ── Signal ──
    pub signal_bar: usize,
    pub signal_date: NaiveDate,

    // ── Execution ──
    pub execution_bar: Option<usize>,
    pub execution_date: Option<NaiveDate>,
    pub execution_price: Option<f64>,

    // ── Holdings after the fill ──
    pub shares_after: f64,
    pub cash_after: f64,
}

impl Trade {
    pub fn is_filled(&self) -> bool {
        self.status == FillStatus::Filled
    }

    pub fn resulting_side(&self) -> PositionSide {
        self.side.resulting_side()
    }
}

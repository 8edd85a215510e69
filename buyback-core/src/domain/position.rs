//! Position state of the single-instrument strategy.

use serde::{Deserialize, Serialize};

/// Which side of the market the portfolio is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Cash,
}

/// Tagged position state.
///
/// The wait counter only exists while in cash, so "counter is zero while
/// long" holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum PositionState {
    Long,
    Cash { wait_counter: usize },
}

impl PositionState {
    pub fn side(&self) -> PositionSide {
        match self {
            PositionState::Long => PositionSide::Long,
            PositionState::Cash { .. } => PositionSide::Cash,
        }
    }

    /// Days spent waiting in cash; always 0 while long.
    pub fn wait_counter(&self) -> usize {
        match self {
            PositionState::Long => 0,
            PositionState::Cash { wait_counter } => *wait_counter,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long)
    }
}

/// Holdings of the portfolio: either cash or shares, never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub shares: f64,
}

impl Portfolio {
    pub fn all_cash(cash: f64) -> Self {
        Self { cash, shares: 0.0 }
    }

    /// Spend all cash on shares at `price`. Fractional shares are allowed.
    pub fn buy_all(&mut self, price: f64) {
        self.shares = self.cash / price;
        self.cash = 0.0;
    }

    /// Sell all shares at `price`.
    pub fn sell_all(&mut self, price: f64) {
        self.cash = self.shares * price;
        self.shares = 0.0;
    }

    /// Value of the holdings marked at `close` for the given side.
    pub fn value(&self, side: PositionSide, close: f64) -> f64 {
        match side {
            PositionSide::Long => self.shares * close,
            PositionSide::Cash => self.cash,
        }
    }
}

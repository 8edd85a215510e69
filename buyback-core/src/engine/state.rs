//! Position state machine.
//!
//! Two states, one counter: `Long` and `Cash { wait_counter }`. Each bar's
//! signal is evaluated at the close; any resulting trade is only scheduled.
//! The state itself changes when that trade fills at the next bar's open
//! (see [`on_fill`]), which keeps a signal from affecting the bar it was
//! observed on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{PositionSide, PositionState, TradeReason, TradeSide};
use crate::metrics::MetricsResult;
use crate::signals::Signal;

use super::config::EngineConfig;
use super::equity::EquityPoint;
use super::ledger::TradeLedger;

/// A trade decided at a bar's close, waiting for the next open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledOrder {
    pub side: TradeSide,
    pub reason: TradeReason,
    pub signal_bar: usize,
    pub signal_date: NaiveDate,
}

/// What the close-of-bar evaluation decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub side: TradeSide,
    pub reason: TradeReason,
}

/// Evaluate one bar's signal against the current state.
///
/// Returns the state carried into the next bar and an optional decision.
/// A scheduled trade leaves the state untouched; the fill applies it.
/// In cash, a cross above is checked before the wait budget, so when both
/// hold on the same bar the trade is recorded as an early buyback.
pub fn transition(
    state: PositionState,
    signal: Signal,
    config: &EngineConfig,
) -> (PositionState, Option<Decision>) {
    match state {
        PositionState::Long => {
            if signal == Signal::CrossBelow {
                let decision = Decision {
                    side: TradeSide::Sell,
                    reason: TradeReason::CrossBelow,
                };
                (state, Some(decision))
            } else {
                (PositionState::Long, None)
            }
        }
        PositionState::Cash { wait_counter } => {
            if signal == Signal::CrossAbove {
                let decision = Decision {
                    side: TradeSide::Buy,
                    reason: TradeReason::EarlyBuyback,
                };
                return (state, Some(decision));
            }
            if config.rule.auto_buyback() && wait_counter >= config.wait_days {
                let decision = Decision {
                    side: TradeSide::Buy,
                    reason: TradeReason::AutomaticBuyback,
                };
                return (state, Some(decision));
            }
            (
                PositionState::Cash {
                    wait_counter: wait_counter + 1,
                },
                None,
            )
        }
    }
}

/// State after a trade of `side` fills.
///
/// A sell starts the wait at 1 (the first day in cash); a buy clears it.
pub fn on_fill(side: TradeSide) -> PositionState {
    match side {
        TradeSide::Sell => PositionState::Cash { wait_counter: 1 },
        TradeSide::Buy => PositionState::Long,
    }
}

/// One row of the day-by-day trace.
///
/// `state` is the position held at this bar's close, after any fill at the
/// open and before this bar's signal is acted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub ma: Option<f64>,
    pub signal: Signal,
    pub state: PositionState,
    pub equity: f64,
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub config: EngineConfig,
    /// Position actually held on bar 0 (cash when history is insufficient).
    pub initial_side: PositionSide,
    pub trace: Vec<BarRecord>,
    pub ledger: TradeLedger,
    pub equity_curve: Vec<EquityPoint>,
    pub benchmark_curve: Vec<EquityPoint>,
    pub metrics: MetricsResult,
    /// Fewer bars than the moving-average period: nothing was traded.
    pub insufficient_history: bool,
}

impl RunResult {
    pub fn bar_count(&self) -> usize {
        self.trace.len()
    }

    pub fn final_state(&self) -> Option<PositionState> {
        self.trace.last().map(|r| r.state)
    }
}

//! Backtesting engine: the buyback state machine and its bar loop.
//!
//! The engine consumes validated daily bars and a moving-average series,
//! then runs three phases per bar:
//!
//! 1. Open: fill the order scheduled at the previous close
//! 2. Close: mark-to-market, trace row
//! 3. Decide: state transition on the bar's signal

pub mod config;
pub mod equity;
pub mod ledger;
pub mod loop_runner;
pub mod pending;
pub mod state;

pub use config::{EngineConfig, InitialPosition, RuleSet};
pub use equity::{benchmark_curve, build_equity_curve, EquityPoint};
pub use ledger::TradeLedger;
pub use loop_runner::{run_backtest, run_with_average};
pub use pending::PendingOrder;
pub use state::{on_fill, transition, BarRecord, Decision, RunResult, ScheduledOrder};

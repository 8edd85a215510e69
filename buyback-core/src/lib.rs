//! Buyback Core: domain types, moving-average signals, the position state
//! machine, and performance metrics.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, positions, trades)
//! - Series validation that fails fast instead of repairing data
//! - Simple moving average and crossover detection
//! - The Long / Cash{wait_counter} state machine with a one-bar fill lag
//! - Trade ledger, equity curve reconstruction, metrics

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod signals;

pub use engine::{run_backtest, run_with_average, EngineConfig, RunResult};
pub use error::{EngineError, MetricsError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a sweep hands across threads is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::PositionState>();
        require_sync::<domain::PositionState>();
        require_send::<domain::Portfolio>();
        require_sync::<domain::Portfolio>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();

        // Engine types
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<engine::TradeLedger>();
        require_sync::<engine::TradeLedger>();

        // Indicators
        require_send::<indicators::Sma>();
        require_sync::<indicators::Sma>();

        // Errors
        require_send::<error::EngineError>();
        require_sync::<error::EngineError>();
    }

    /// Architecture contract: signal detection never sees portfolio state.
    ///
    /// `detect_signals` takes bars and the average only. If a position or
    /// portfolio parameter is ever added, this stops compiling.
    #[test]
    fn signal_detection_has_no_portfolio_parameter() {
        fn _check(
            bars: &[domain::PriceBar],
            ma: &[Option<f64>],
        ) -> Vec<signals::Signal> {
            signals::detect_signals(bars, ma)
        }
    }
}

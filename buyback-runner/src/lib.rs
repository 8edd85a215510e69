//! Buyback Runner: backtest orchestration on top of `buyback-core`.
//!
//! This crate provides:
//! - Data loading from CSV/Parquet files, with a synthetic fallback
//! - TOML backtest configuration
//! - Single-backtest runner with warmup windowing and run provenance
//! - Parallel parameter sweeps over wait budgets and average periods
//! - JSON/CSV artifacts and text/Markdown summaries

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_bars, DataSource, LoadError, LoadOptions, LoadedData};
pub use export::{format_summary, format_sweep_table, load_artifacts, save_artifacts};
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
pub use sweep::{GridPoint, ParamGrid, ParamSweep, SweepOutcome, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn loaded_data_is_send_sync() {
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<ParamSweep>();
        assert_sync::<ParamSweep>();
        assert_send::<SweepOutcome>();
        assert_sync::<SweepOutcome>();
    }
}

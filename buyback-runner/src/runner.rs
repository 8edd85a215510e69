//! Backtest runner: wires together data loading, the engine, and provenance.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads data, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data. Used by sweeps, which
//!   load once and run many configurations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use buyback_core::data::validate_series;
use buyback_core::engine::{run_with_average, EngineConfig, RuleSet};
use buyback_core::indicators::{Indicator, Sma};
use buyback_core::{EngineError, RunResult};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, DataSource, LoadError, LoadOptions, LoadedData};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no bars for '{symbol}' on or after {start}")]
    EmptyWindow { symbol: String, start: NaiveDate },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dataset_hash: String,
    pub data_source: DataSource,
    pub has_synthetic: bool,
    /// Bars before the window that only fed the moving average.
    pub warmup_bars: usize,
    pub run: RunResult,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Summary heading, e.g. "Buyback-10 Strategy (MA200) Summary".
    pub fn title(&self) -> String {
        let config = &self.run.config;
        match config.rule {
            RuleSet::Buyback => format!(
                "Buyback-{} Strategy (MA{}) Summary",
                config.wait_days, config.ma_period
            ),
            RuleSet::TrendOnly => format!("MA{} Trend Strategy Summary", config.ma_period),
        }
    }
}

/// Run a single backtest from a BacktestConfig (loads data first).
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let engine_config = config.to_engine_config()?;
    let symbol = &config.backtest.symbol;

    // Load everything up to the end date; history before the window start
    // warms up the average.
    let opts = LoadOptions {
        path: config.backtest.data.clone(),
        start: None,
        end: config.backtest.end_date,
        synthetic: config.backtest.synthetic,
    };
    let loaded = load_bars(symbol, &opts)?;

    let last_date = loaded.bars[loaded.bars.len() - 1].date;
    let window_start = config.window_start(last_date);

    run_backtest_from_data(&loaded, window_start, &engine_config)
}

/// Run a backtest with pre-loaded data, no I/O.
///
/// The moving average is computed over the whole loaded series, then both
/// bars and average are cut at `window_start`. The engine starts fresh at
/// the window's first bar.
pub fn run_backtest_from_data(
    data: &LoadedData,
    window_start: Option<NaiveDate>,
    engine_config: &EngineConfig,
) -> Result<BacktestResult, RunError> {
    engine_config.validate()?;
    validate_series(&data.bars, engine_config.max_gap_days)?;

    let first = window_start
        .map(|start| data.bars.partition_point(|b| b.date < start))
        .unwrap_or(0);
    if first >= data.bars.len() {
        return Err(RunError::EmptyWindow {
            symbol: data.symbol.clone(),
            start: window_start.unwrap_or(data.bars[0].date),
        });
    }

    let ma = Sma::new(engine_config.ma_period).compute(&data.bars);
    let bars = &data.bars[first..];
    let run = run_with_average(bars, &ma[first..], engine_config)?;

    log::info!(
        "{} ma={} wait={} {:?}: {} bars ({} warmup), final {:.2}",
        data.symbol,
        engine_config.ma_period,
        engine_config.wait_days,
        engine_config.rule,
        bars.len(),
        first,
        run.metrics.final_value
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: run_id(engine_config, &data.dataset_hash, bars[0].date),
        symbol: data.symbol.clone(),
        start_date: bars[0].date,
        end_date: bars[bars.len() - 1].date,
        dataset_hash: data.dataset_hash.clone(),
        data_source: data.source,
        has_synthetic: data.has_synthetic,
        warmup_bars: first,
        run,
    })
}

/// Deterministic hash over engine parameters, dataset, and window start.
///
/// Two runs with the same RunId produce identical results.
pub fn run_id(config: &EngineConfig, dataset_hash: &str, start: NaiveDate) -> RunId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(dataset_hash.as_bytes());
    hasher.update(start.to_string().as_bytes());
    hasher.update(&(config.ma_period as u64).to_le_bytes());
    hasher.update(&(config.wait_days as u64).to_le_bytes());
    hasher.update(&config.initial_cash.to_le_bytes());
    hasher.update(format!("{:?}/{:?}", config.initial_position, config.rule).as_bytes());
    hasher.update(&config.max_gap_days.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

//! Serializable backtest configuration (TOML).
//!
//! ```toml
//! [backtest]
//! symbol = "SPY"
//! data = "data/SPY.csv"
//! start_date = "2019-01-01"
//! initial_cash = 10000.0
//!
//! [strategy]
//! ma_period = 200
//! wait_days = 10
//! ```
//!
//! Integer parameters are read as signed so that a negative value reaches
//! validation and is reported as an invalid config, not a parse error.

use std::fs;
use std::path::{Path, PathBuf};

use buyback_core::data::DEFAULT_MAX_GAP_DAYS;
use buyback_core::engine::{EngineConfig, InitialPosition, RuleSet};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level config file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
}

/// `[backtest]`: what to run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// CSV or Parquet file with daily bars.
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Inclusive window. Bars before `start_date` still warm up the average.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Trailing window length, counted back from the last bar. Ignored when
    /// `start_date` is set.
    #[serde(default)]
    pub years: Option<i64>,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    /// Generate a random-walk series instead of reading `data`.
    #[serde(default)]
    pub synthetic: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            data: None,
            start_date: None,
            end_date: None,
            years: None,
            initial_cash: default_initial_cash(),
            synthetic: false,
        }
    }
}

/// `[strategy]`: buyback parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_ma_period")]
    pub ma_period: i64,
    #[serde(default = "default_wait_days")]
    pub wait_days: i64,
    #[serde(default)]
    pub initial_position: InitialPosition,
    #[serde(default)]
    pub rule: RuleSet,
    #[serde(default = "default_max_gap_days")]
    pub max_gap_days: i64,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            ma_period: default_ma_period(),
            wait_days: default_wait_days(),
            initial_position: InitialPosition::default(),
            rule: RuleSet::default(),
            max_gap_days: default_max_gap_days(),
        }
    }
}

fn default_symbol() -> String {
    "SPY".into()
}

fn default_initial_cash() -> f64 {
    10_000.0
}

fn default_ma_period() -> i64 {
    200
}

fn default_wait_days() -> i64 {
    10
}

fn default_max_gap_days() -> i64 {
    DEFAULT_MAX_GAP_DAYS
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Validate and convert the strategy section into an engine config.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let s = &self.strategy;
        let (ma_period, wait_days) = strategy_params(s.ma_period, s.wait_days)?;

        let config = EngineConfig {
            ma_period,
            wait_days,
            initial_cash: self.backtest.initial_cash,
            initial_position: s.initial_position,
            rule: s.rule,
            max_gap_days: s.max_gap_days,
        };
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.check_window()?;
        Ok(config)
    }

    fn check_window(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if let (Some(start), Some(end)) = (b.start_date, b.end_date) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        if let Some(years) = b.years {
            if years < 1 {
                return Err(ConfigError::Invalid(format!(
                    "years must be >= 1, got {years}"
                )));
            }
        }
        Ok(())
    }

    /// First date of the backtest window given the last available bar.
    ///
    /// `start_date` wins over `years`; with neither, the whole series is used.
    pub fn window_start(&self, last_date: NaiveDate) -> Option<NaiveDate> {
        if self.backtest.start_date.is_some() {
            return self.backtest.start_date;
        }
        let years = u32::try_from(self.backtest.years?).ok()?;
        let end = self.backtest.end_date.unwrap_or(last_date).min(last_date);
        end.checked_sub_months(Months::new(years.saturating_mul(12)))
    }
}

/// Check signed period and wait values and convert them for the engine.
pub fn strategy_params(ma_period: i64, wait_days: i64) -> Result<(usize, usize), ConfigError> {
    if ma_period <= 0 {
        return Err(ConfigError::Invalid(format!(
            "ma_period must be > 0, got {ma_period}"
        )));
    }
    if wait_days < 0 {
        return Err(ConfigError::Invalid(format!(
            "wait_days must be >= 0, got {wait_days}"
        )));
    }
    let ma = usize::try_from(ma_period)
        .map_err(|_| ConfigError::Invalid(format!("ma_period {ma_period} out of range")))?;
    let wait = usize::try_from(wait_days)
        .map_err(|_| ConfigError::Invalid(format!("wait_days {wait_days} out of range")))?;
    Ok((ma, wait))
}

//! Structured errors for a single backtest invocation.

use chrono::NaiveDate;
use thiserror::Error;

/// Reasons a run is rejected before the bar loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("price series is empty")]
    EmptySeries,

    #[error("dates not strictly increasing at bar {index}: {previous} then {current}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("bar {index} ({date}) falls on a weekend")]
    WeekendBar { index: usize, date: NaiveDate },

    #[error("calendar gap of {gap_days} days before bar {index} ({date}) exceeds {max_gap_days}")]
    CalendarGap {
        index: usize,
        date: NaiveDate,
        gap_days: i64,
        max_gap_days: i64,
    },

    #[error("bar {index} ({date}) has non-positive or non-finite prices")]
    InvalidPrice { index: usize, date: NaiveDate },
}

/// Metric computations that have no meaningful value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("metric domain error: {0}")]
    Domain(String),
}

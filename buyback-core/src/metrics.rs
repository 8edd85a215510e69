//! Performance metrics: pure functions over a completed equity curve.
//!
//! Every metric is a pure function: equity values and/or dates in, scalar out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::equity::{values, EquityPoint};
use crate::engine::ledger::TradeLedger;
use crate::error::MetricsError;

/// Calendar days per year used to annualize returns.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Summary statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub total_return: f64,
    /// `None` when the elapsed time or starting equity makes it undefined.
    pub cagr: Option<f64>,
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub pending_trades: usize,
    pub initial_value: f64,
    pub final_value: f64,
    pub period_days: i64,
    pub years_elapsed: f64,
    pub benchmark_final: f64,
    pub benchmark_total_return: f64,
}

impl MetricsResult {
    /// Compute all metrics from the strategy curve, its buy-and-hold
    /// benchmark, and the ledger.
    pub fn compute(
        equity_curve: &[EquityPoint],
        benchmark_curve: &[EquityPoint],
        ledger: &TradeLedger,
    ) -> Self {
        let strategy = values(equity_curve);
        let bench = values(benchmark_curve);

        let (period_days, years) = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (
                (last.date - first.date).num_days(),
                elapsed_years(first.date, last.date),
            ),
            _ => (0, 0.0),
        };

        let cagr = match cagr(&strategy, years) {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("CAGR undefined: {e}");
                None
            }
        };

        Self {
            total_return: total_return(&strategy),
            cagr,
            max_drawdown: max_drawdown(&strategy),
            trade_count: ledger.trade_count(),
            pending_trades: ledger.len() - ledger.trade_count(),
            initial_value: strategy.first().copied().unwrap_or(0.0),
            final_value: strategy.last().copied().unwrap_or(0.0),
            period_days,
            years_elapsed: years,
            benchmark_final: bench.last().copied().unwrap_or(0.0),
            benchmark_total_return: total_return(&bench),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial - 1.
///
/// Returns 0.0 for an empty curve or a non-positive starting value.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&initial), Some(&final_eq)) if initial > 0.0 => final_eq / initial - 1.0,
        _ => 0.0,
    }
}

/// Calendar years between two dates (365.25-day years).
pub fn elapsed_years(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// Compound Annual Growth Rate over `years`.
pub fn cagr(equity: &[f64], years: f64) -> Result<f64, MetricsError> {
    let (Some(&initial), Some(&final_eq)) = (equity.first(), equity.last()) else {
        return Err(MetricsError::Domain("empty equity curve".into()));
    };
    if !(years > 0.0) {
        return Err(MetricsError::Domain(format!(
            "elapsed years must be > 0, got {years}"
        )));
    }
    if !(initial > 0.0) {
        return Err(MetricsError::Domain(format!(
            "initial equity must be > 0, got {initial}"
        )));
    }
    Ok((final_eq / initial).powf(1.0 / years) - 1.0)
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a prior peak.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = eq / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

//! Parameter sweeps over wait-day budgets and moving-average periods.
//!
//! Every configuration runs against the same pre-loaded series. Runs are
//! independent, so they execute in parallel with rayon; one configuration
//! failing never aborts the others. A shared flag cancels the sweep at
//! whole-run granularity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;

use buyback_core::engine::EngineConfig;

use crate::config::strategy_params;
use crate::data_loader::LoadedData;
use crate::runner::{run_backtest_from_data, BacktestResult};

/// Parameter grid specification.
///
/// Values are signed so that a negative budget or period reaches validation
/// and fails its own grid point instead of the whole sweep.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub wait_days: Vec<i64>,
    pub ma_periods: Vec<i64>,
}

impl ParamGrid {
    /// The budgets and periods the classic rule is usually compared across.
    pub fn buyback_default() -> Self {
        Self {
            wait_days: vec![5, 10, 15, 20],
            ma_periods: vec![50, 100, 200],
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.wait_days.len() * self.ma_periods.len()
    }

    /// Every (ma_period, wait_days) combination, ordered by period then
    /// budget.
    pub fn points(&self) -> Vec<GridPoint> {
        let mut points = Vec::with_capacity(self.size());
        for &ma_period in &self.ma_periods {
            for &wait_days in &self.wait_days {
                points.push(GridPoint {
                    ma_period,
                    wait_days,
                });
            }
        }
        points
    }
}

/// One (period, budget) combination as requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPoint {
    pub ma_period: i64,
    pub wait_days: i64,
}

impl GridPoint {
    fn of(config: &EngineConfig) -> Self {
        Self {
            ma_period: i64::try_from(config.ma_period).unwrap_or(i64::MAX),
            wait_days: i64::try_from(config.wait_days).unwrap_or(i64::MAX),
        }
    }

    /// `base` with this point's period and budget, validated.
    pub fn to_engine_config(&self, base: &EngineConfig) -> Result<EngineConfig, String> {
        let (ma_period, wait_days) =
            strategy_params(self.ma_period, self.wait_days).map_err(|e| e.to_string())?;
        let mut config = base.clone();
        config.ma_period = ma_period;
        config.wait_days = wait_days;
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

/// Outcome for one grid point.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    Completed(Box<BacktestResult>),
    Failed { point: GridPoint, error: String },
    Cancelled { point: GridPoint },
}

impl SweepOutcome {
    pub fn result(&self) -> Option<&BacktestResult> {
        match self {
            SweepOutcome::Completed(r) => Some(&**r),
            _ => None,
        }
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
    cancel: Arc<AtomicBool>,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self {
            parallel: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Share an external cancellation flag (e.g. set from a Ctrl-C handler).
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run every point in `grid` against `data`, each applied to `base`.
    ///
    /// Outcomes come back in grid order regardless of scheduling.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &EngineConfig,
        data: &LoadedData,
        window_start: Option<NaiveDate>,
    ) -> SweepResults {
        let jobs = grid
            .points()
            .into_iter()
            .map(|point| (point, point.to_engine_config(base)))
            .collect();
        self.run_jobs(jobs, data, window_start)
    }

    /// Run an explicit list of configurations.
    pub fn run_configs(
        &self,
        configs: Vec<EngineConfig>,
        data: &LoadedData,
        window_start: Option<NaiveDate>,
    ) -> SweepResults {
        let jobs = configs
            .into_iter()
            .map(|config| (GridPoint::of(&config), Ok(config)))
            .collect();
        self.run_jobs(jobs, data, window_start)
    }

    fn run_jobs(
        &self,
        jobs: Vec<(GridPoint, Result<EngineConfig, String>)>,
        data: &LoadedData,
        window_start: Option<NaiveDate>,
    ) -> SweepResults {
        let run_one = |(point, config): (GridPoint, Result<EngineConfig, String>)| -> SweepOutcome {
            if self.cancel.load(Ordering::Relaxed) {
                return SweepOutcome::Cancelled { point };
            }
            let outcome = config.and_then(|config| {
                run_backtest_from_data(data, window_start, &config).map_err(|e| e.to_string())
            });
            match outcome {
                Ok(result) => SweepOutcome::Completed(Box::new(result)),
                Err(error) => {
                    log::warn!(
                        "sweep: ma={} wait={} failed: {error}",
                        point.ma_period,
                        point.wait_days
                    );
                    SweepOutcome::Failed { point, error }
                }
            }
        };

        let outcomes: Vec<SweepOutcome> = if self.parallel {
            jobs.into_par_iter().map(run_one).collect()
        } else {
            jobs.into_iter().map(run_one).collect()
        };

        SweepResults::new(outcomes)
    }
}

/// Results from a parameter sweep.
#[derive(Debug, Clone)]
pub struct SweepResults {
    outcomes: Vec<SweepOutcome>,
}

impl SweepResults {
    fn new(outcomes: Vec<SweepOutcome>) -> Self {
        Self { outcomes }
    }

    /// All outcomes in grid order.
    pub fn outcomes(&self) -> &[SweepOutcome] {
        &self.outcomes
    }

    /// Completed results in grid order.
    pub fn completed(&self) -> impl Iterator<Item = &BacktestResult> {
        self.outcomes.iter().filter_map(SweepOutcome::result)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SweepOutcome::Failed { .. }))
            .count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SweepOutcome::Cancelled { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Completed run with the highest total return.
    pub fn best_by_total_return(&self) -> Option<&BacktestResult> {
        self.completed().max_by(|a, b| {
            a.run
                .metrics
                .total_return
                .total_cmp(&b.run.metrics.total_return)
        })
    }

    /// Completed runs sorted by total return, best first.
    pub fn ranked(&self) -> Vec<&BacktestResult> {
        let mut ranked: Vec<&BacktestResult> = self.completed().collect();
        ranked.sort_by(|a, b| {
            b.run
                .metrics
                .total_return
                .total_cmp(&a.run.metrics.total_return)
        });
        ranked
    }
}

//! Engine configuration and fail-fast validation.

use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_MAX_GAP_DAYS;
use crate::domain::PositionState;
use crate::error::EngineError;

/// Position held on bar 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialPosition {
    /// Fully invested at bar 0's close.
    #[default]
    Long,
    /// All cash; the wait counter starts at 0.
    Cash,
}

impl InitialPosition {
    pub fn state(&self) -> PositionState {
        match self {
            InitialPosition::Long => PositionState::Long,
            InitialPosition::Cash => PositionState::Cash { wait_counter: 0 },
        }
    }
}

/// Re-entry rule applied while in cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// Buy back on a cross above, or automatically once the wait budget runs out.
    #[default]
    Buyback,
    /// Plain moving-average filter: buy back only on a cross above.
    TrendOnly,
}

impl RuleSet {
    pub fn auto_buyback(&self) -> bool {
        matches!(self, RuleSet::Buyback)
    }
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ma_period: usize,
    pub wait_days: usize,
    pub initial_cash: f64,
    #[serde(default)]
    pub initial_position: InitialPosition,
    #[serde(default)]
    pub rule: RuleSet,
    /// Widest calendar gap tolerated between consecutive bars.
    #[serde(default = "default_max_gap_days")]
    pub max_gap_days: i64,
}

fn default_max_gap_days() -> i64 {
    DEFAULT_MAX_GAP_DAYS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ma_period: 200,
            wait_days: 10,
            initial_cash: 10_000.0,
            initial_position: InitialPosition::Long,
            rule: RuleSet::Buyback,
            max_gap_days: DEFAULT_MAX_GAP_DAYS,
        }
    }
}

impl EngineConfig {
    pub fn new(ma_period: usize, wait_days: usize, initial_cash: f64) -> Self {
        Self {
            ma_period,
            wait_days,
            initial_cash,
            ..Self::default()
        }
    }

    pub fn with_initial_position(mut self, initial_position: InitialPosition) -> Self {
        self.initial_position = initial_position;
        self
    }

    pub fn with_rule(mut self, rule: RuleSet) -> Self {
        self.rule = rule;
        self
    }

    /// Reject configurations that cannot produce a meaningful run.
    ///
    /// `wait_days` is unsigned here; negative values are rejected by the
    /// runner when it converts user input.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.ma_period == 0 {
            return Err(EngineError::InvalidConfig(
                "ma_period must be > 0".into(),
            ));
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "initial_cash must be a positive number, got {}",
                self.initial_cash
            )));
        }
        if self.max_gap_days < 1 {
            return Err(EngineError::InvalidConfig(format!(
                "max_gap_days must be >= 1, got {}",
                self.max_gap_days
            )));
        }
        Ok(())
    }
}

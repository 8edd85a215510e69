//! Price series validation.
//!
//! The engine refuses series it cannot trust rather than repairing them:
//! dates must be strictly increasing weekdays with no calendar gap wider
//! than `max_gap_days`, and every open/close must be finite and positive.

use crate::domain::PriceBar;
use crate::error::EngineError;

/// Longest calendar gap between consecutive US trading days seen in
/// practice (the September 2001 closure, 2001-09-10 → 2001-09-17).
pub const DEFAULT_MAX_GAP_DAYS: i64 = 7;

/// Validate a daily series. Returns the first violation found.
pub fn validate_series(bars: &[PriceBar], max_gap_days: i64) -> Result<(), EngineError> {
    if bars.is_empty() {
        return Err(EngineError::EmptySeries);
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(EngineError::InvalidPrice {
                index: i,
                date: bar.date,
            });
        }
        if bar.is_weekend() {
            return Err(EngineError::WeekendBar {
                index: i,
                date: bar.date,
            });
        }
        if i == 0 {
            continue;
        }

        let prev = &bars[i - 1];
        if bar.date <= prev.date {
            return Err(EngineError::NonMonotonicDates {
                index: i,
                previous: prev.date,
                current: bar.date,
            });
        }

        let gap_days = (bar.date - prev.date).num_days();
        if gap_days > max_gap_days {
            return Err(EngineError::CalendarGap {
                index: i,
                date: bar.date,
                gap_days,
                max_gap_days,
            });
        }
    }

    Ok(())
}

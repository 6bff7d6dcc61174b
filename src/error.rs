//! Configuration error taxonomy.
//!
//! Only configuration problems are fatal. Constraint-level conditions are
//! reported through [`crate::validation::ValidationResult`] and never raised
//! as errors; infeasible associates are recorded on the schedule itself.

use chrono::NaiveDate;
use thiserror::Error;

/// A fatal configuration error detected before solving.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Shift policy bounds are inverted.
    #[error("inconsistent shift policy: max_work {max} min is below min_work {min} min")]
    InconsistentShiftPolicy { min: u32, max: u32 },

    /// Lunch policy thresholds are inverted.
    #[error(
        "inconsistent lunch policy: short_lunch_threshold {short} min is below \
         no_lunch_threshold {no} min"
    )]
    InconsistentLunchPolicy { no: u32, short: u32 },

    /// Break policy thresholds are inverted.
    #[error(
        "inconsistent break policy: two_break_threshold {two} min is below \
         one_break_threshold {one} min"
    )]
    InconsistentBreakPolicy { one: u32, two: u32 },

    /// An associate ends up with no role they may perform.
    #[error("associate '{id}' has an empty eligible role set")]
    EmptyRoleSet { id: String },

    /// Weekly request dates are reversed.
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Slot length must be a positive number of minutes.
    #[error("slot_minutes must be positive")]
    NonPositiveSlotMinutes,

    /// The operating window contains no time.
    #[error("empty operating window: day_end {end} min must be after day_start {start} min")]
    EmptyOperatingWindow { start: u32, end: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ConfigError::InconsistentLunchPolicy { no: 360, short: 300 };
        assert!(e.to_string().contains("short_lunch_threshold 300"));

        let e = ConfigError::EmptyRoleSet { id: "A1".into() };
        assert!(e.to_string().contains("'A1'"));
    }
}

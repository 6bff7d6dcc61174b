//! Request parameters for daily and weekly solves.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::associate::{Associate, JobRole};
use crate::models::time::TimeGrid;

/// Cap used for roles without an explicit entry in `job_caps`.
///
/// Large enough to never bind for realistic rosters, which is what makes
/// `Picking` behave as overflow by default.
pub const UNCAPPED: u32 = 999;

/// Default per-role simultaneous-assignment caps.
pub fn default_job_caps() -> BTreeMap<JobRole, u32> {
    BTreeMap::from([
        (JobRole::Picking, UNCAPPED),
        (JobRole::GmdSm, 2),
        (JobRole::ExceptionSm, 2),
        (JobRole::Staging, 2),
        (JobRole::Backroom, 8),
    ])
}

/// Pattern for distributing days off within a week.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DaysOffPattern {
    /// No pattern enforced (required days off still apply).
    None,
    /// At least one pair of consecutive calendar days both off.
    #[default]
    TwoConsecutive,
    /// At least one Saturday or Sunday off.
    OneWeekendDay,
    /// No two consecutive working days.
    EveryOtherDay,
}

/// Fairness tuning for weekly scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessConfig {
    /// Target work minutes per associate per week (`None` = their weekly max).
    pub target_weekly_minutes: Option<u32>,
    /// Minimum weekly minutes before a shortfall warning is raised.
    pub min_weekly_minutes: u32,
    /// Allowed spread between the most- and least-worked associates, in minutes.
    pub max_hours_variance: f64,
    /// Weight of the hours-balance term in the scheduling bias.
    pub weight_hours_balance: f64,
    /// Weight of the days-balance term in the scheduling bias.
    pub weight_days_balance: f64,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            target_weekly_minutes: None,
            min_weekly_minutes: 0,
            max_hours_variance: 120.0,
            weight_hours_balance: 0.7,
            weight_days_balance: 0.3,
        }
    }
}

/// Request for a single-day schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Date to schedule.
    pub date: NaiveDate,
    /// Associates to schedule, in caller order. Iteration order is part of
    /// the determinism contract.
    pub associates: Vec<Associate>,
    /// Operating window and slot size.
    pub grid: TimeGrid,
    /// Per-role caps; roles without an entry fall back to [`UNCAPPED`].
    pub job_caps: BTreeMap<JobRole, u32>,
    /// Busy days widen the lunch placement window.
    pub is_busy_day: bool,
    /// Seed driving every tie-break and shuffle.
    pub seed: u64,
}

impl ScheduleRequest {
    /// Creates a request with default window, caps, and seed.
    pub fn new(date: NaiveDate, associates: Vec<Associate>) -> Self {
        Self {
            date,
            associates,
            grid: TimeGrid::default(),
            job_caps: default_job_caps(),
            is_busy_day: false,
            seed: 0,
        }
    }

    /// Sets the operating window.
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Sets per-role caps.
    pub fn with_job_caps(mut self, caps: BTreeMap<JobRole, u32>) -> Self {
        self.job_caps = caps;
        self
    }

    /// Marks the day as busy.
    pub fn with_busy_day(mut self, busy: bool) -> Self {
        self.is_busy_day = busy;
        self
    }

    /// Sets the determinism seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cap for a role, falling back to [`UNCAPPED`].
    pub fn job_cap(&self, role: JobRole) -> u32 {
        self.job_caps.get(&role).copied().unwrap_or(UNCAPPED)
    }

    /// Checks the request for fatal configuration errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.slot_minutes == 0 {
            return Err(ConfigError::NonPositiveSlotMinutes);
        }
        if self.grid.day_end_minutes <= self.grid.day_start_minutes {
            return Err(ConfigError::EmptyOperatingWindow {
                start: self.grid.day_start_minutes,
                end: self.grid.day_end_minutes,
            });
        }
        for associate in &self.associates {
            if associate.eligible_roles().is_empty() {
                return Err(ConfigError::EmptyRoleSet {
                    id: associate.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Request for a multi-day schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyScheduleRequest {
    /// First date of the period.
    pub start_date: NaiveDate,
    /// Last date of the period (inclusive).
    pub end_date: NaiveDate,
    /// Associates to schedule, in caller order.
    pub associates: Vec<Associate>,
    /// Operating window and slot size, shared by every day.
    pub grid: TimeGrid,
    /// Per-role caps.
    pub job_caps: BTreeMap<JobRole, u32>,
    /// Dates with widened lunch placement.
    pub busy_days: BTreeSet<NaiveDate>,
    /// Days-off distribution pattern.
    pub days_off_pattern: DaysOffPattern,
    /// Minimum days off per associate over the period.
    pub required_days_off: u32,
    /// Fairness tuning.
    pub fairness: FairnessConfig,
    /// Seed driving every tie-break and shuffle.
    pub seed: u64,
}

impl WeeklyScheduleRequest {
    /// Creates a request with default window, caps, pattern, and fairness.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, associates: Vec<Associate>) -> Self {
        Self {
            start_date,
            end_date,
            associates,
            grid: TimeGrid::default(),
            job_caps: default_job_caps(),
            busy_days: BTreeSet::new(),
            days_off_pattern: DaysOffPattern::default(),
            required_days_off: 2,
            fairness: FairnessConfig::default(),
            seed: 0,
        }
    }

    /// Sets the operating window.
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the days-off pattern.
    pub fn with_days_off_pattern(mut self, pattern: DaysOffPattern) -> Self {
        self.days_off_pattern = pattern;
        self
    }

    /// Sets the minimum days off.
    pub fn with_required_days_off(mut self, days: u32) -> Self {
        self.required_days_off = days;
        self
    }

    /// Marks busy dates.
    pub fn with_busy_days(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.busy_days.extend(dates);
        self
    }

    /// Sets fairness tuning.
    pub fn with_fairness(mut self, fairness: FairnessConfig) -> Self {
        self.fairness = fairness;
        self
    }

    /// Sets the determinism seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// All dates of the period, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut current = self.start_date;
        while current <= self.end_date {
            dates.push(current);
            current = match current.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        dates
    }

    /// Number of days in the period.
    pub fn num_days(&self) -> usize {
        self.dates().len()
    }

    /// Whether a date is marked busy.
    pub fn is_busy_day(&self, date: NaiveDate) -> bool {
        self.busy_days.contains(&date)
    }

    /// Projects a single-day request for `date`.
    ///
    /// The caller may substitute an adjusted associate list (weekly-cap
    /// clamping) before solving.
    pub fn day_request(&self, date: NaiveDate, associates: Vec<Associate>) -> ScheduleRequest {
        ScheduleRequest {
            date,
            associates,
            grid: self.grid,
            job_caps: self.job_caps.clone(),
            is_busy_day: self.is_busy_day(date),
            seed: self.seed,
        }
    }

    /// Checks the request for fatal configuration errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_date < self.start_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        // Day-level checks are shared with the daily request.
        self.day_request(self.start_date, self.associates.clone())
            .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::associate::Associate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_caps_make_picking_overflow() {
        let request = ScheduleRequest::new(d("2026-08-03"), vec![]);
        assert_eq!(request.job_cap(JobRole::Picking), UNCAPPED);
        assert_eq!(request.job_cap(JobRole::GmdSm), 2);
        assert_eq!(request.job_cap(JobRole::Sr), UNCAPPED); // No entry → uncapped
    }

    #[test]
    fn test_validate_rejects_bad_grid() {
        let mut request = ScheduleRequest::new(d("2026-08-03"), vec![]);
        request.grid.slot_minutes = 0;
        assert_eq!(request.validate(), Err(ConfigError::NonPositiveSlotMinutes));

        let mut request = ScheduleRequest::new(d("2026-08-03"), vec![]);
        request.grid.day_end_minutes = request.grid.day_start_minutes;
        assert!(matches!(
            request.validate(),
            Err(ConfigError::EmptyOperatingWindow { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_role_set() {
        let associate = Associate::new("A1", "Alice")
            .with_allowed_roles([JobRole::Picking])
            .with_cannot_do([JobRole::Picking]);
        let request = ScheduleRequest::new(d("2026-08-03"), vec![associate]);
        assert!(matches!(
            request.validate(),
            Err(ConfigError::EmptyRoleSet { .. })
        ));
    }

    #[test]
    fn test_weekly_dates_inclusive() {
        let request = WeeklyScheduleRequest::new(d("2026-08-03"), d("2026-08-09"), vec![]);
        let dates = request.dates();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], d("2026-08-03"));
        assert_eq!(dates[6], d("2026-08-09"));
        assert_eq!(request.num_days(), 7);
    }

    #[test]
    fn test_weekly_validate_rejects_reversed_dates() {
        let request = WeeklyScheduleRequest::new(d("2026-08-09"), d("2026-08-03"), vec![]);
        assert!(matches!(
            request.validate(),
            Err(ConfigError::InvalidDateRange { .. })
        ));
    }
}

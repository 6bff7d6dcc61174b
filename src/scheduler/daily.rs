//! Single-day scheduling entry point.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::models::{Associate, DaySchedule, ScheduleRequest};
use crate::policies::{
    BreakPolicy, DefaultBreakPolicy, DefaultLunchPolicy, DefaultShiftPolicy, LunchPolicy,
    ShiftPolicy,
};
use crate::solver::candidates::CandidateGenerator;
use crate::solver::heuristic::HeuristicSolver;

/// Builds an id → associate lookup in the caller's order.
pub(crate) fn associates_by_id(request: &ScheduleRequest) -> HashMap<String, Associate> {
    request
        .associates
        .iter()
        .map(|a| (a.id.clone(), a.clone()))
        .collect()
}

/// High-level daily scheduler: candidate generation plus the heuristic
/// solver under one set of policies.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use shiftplan::models::{Associate, Availability, ScheduleRequest};
/// use shiftplan::scheduler::Scheduler;
///
/// let date = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
/// let associate = Associate::new("A1", "Alice")
///     .with_availability(date, Availability::new(0, 68));
/// let request = ScheduleRequest::new(date, vec![associate]);
///
/// let schedule = Scheduler::new().generate_schedule(&request).unwrap();
/// assert_eq!(schedule.assignments.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    shift_policy: Arc<dyn ShiftPolicy>,
    lunch_policy: Arc<dyn LunchPolicy>,
    break_policy: Arc<dyn BreakPolicy>,
    generator: CandidateGenerator,
    solver: HeuristicSolver,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler with default policies.
    pub fn new() -> Self {
        Self::with_policies(
            Arc::new(DefaultShiftPolicy::default()),
            Arc::new(DefaultLunchPolicy::default()),
            Arc::new(DefaultBreakPolicy::default()),
        )
    }

    /// Creates a scheduler over explicit policies. The generator, solver,
    /// and any validator built from the same objects stay in agreement.
    pub fn with_policies(
        shift_policy: Arc<dyn ShiftPolicy>,
        lunch_policy: Arc<dyn LunchPolicy>,
        break_policy: Arc<dyn BreakPolicy>,
    ) -> Self {
        let generator = CandidateGenerator::with_policies(
            shift_policy.clone(),
            lunch_policy.clone(),
            break_policy.clone(),
        );
        let solver = HeuristicSolver::with_policies(lunch_policy.clone(), break_policy.clone());
        Self {
            shift_policy,
            lunch_policy,
            break_policy,
            generator,
            solver,
        }
    }

    /// Sets candidate enumeration granularity.
    pub fn with_step_slots(mut self, step_slots: usize) -> Self {
        self.generator = self.generator.with_step_slots(step_slots);
        self
    }

    pub(crate) fn validate_config(&self, request: &ScheduleRequest) -> Result<(), ConfigError> {
        request.validate()?;
        self.shift_policy.validate()?;
        self.lunch_policy.validate()?;
        self.break_policy.validate()?;
        Ok(())
    }

    /// Generates a complete schedule for one day.
    pub fn generate_schedule(&self, request: &ScheduleRequest) -> Result<DaySchedule, ConfigError> {
        self.validate_config(request)?;

        let candidates = self.generator.generate_all(request);
        let lookup = associates_by_id(request);
        let schedule = self.solver.solve(request, &candidates, &lookup);
        info!(
            date = %request.date,
            scheduled = schedule.assignments.len(),
            unscheduled = schedule.unscheduled.len(),
            "daily schedule generated"
        );
        Ok(schedule)
    }

    /// Generates a schedule along with summary statistics.
    pub fn generate_with_stats(
        &self,
        request: &ScheduleRequest,
    ) -> Result<(DaySchedule, ScheduleStats), ConfigError> {
        let schedule = self.generate_schedule(request)?;
        let stats = ScheduleStats::calculate(&schedule, request);
        Ok((schedule, stats))
    }
}

/// Summary statistics for one day's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStats {
    pub total_associates: usize,
    pub scheduled_associates: usize,
    pub unscheduled_associates: usize,
    pub total_work_minutes: u32,
    pub total_lunch_minutes: u32,
    pub total_break_minutes: u32,
    pub min_coverage: u32,
    pub max_coverage: u32,
    pub avg_coverage: f64,
}

impl ScheduleStats {
    /// Computes statistics from a schedule and its request.
    pub fn calculate(schedule: &DaySchedule, request: &ScheduleRequest) -> Self {
        let grid = &schedule.grid;
        let timeline = schedule.coverage_timeline();
        let avg_coverage = if timeline.is_empty() {
            0.0
        } else {
            timeline.iter().map(|&c| c as f64).sum::<f64>() / timeline.len() as f64
        };

        Self {
            total_associates: request.associates.len(),
            scheduled_associates: schedule.assignments.len(),
            unscheduled_associates: schedule.unscheduled.len(),
            total_work_minutes: schedule.total_work_minutes(),
            total_lunch_minutes: schedule
                .assignments
                .values()
                .map(|a| a.lunch_minutes(grid))
                .sum(),
            total_break_minutes: schedule
                .assignments
                .values()
                .map(|a| a.break_minutes(grid))
                .sum(),
            min_coverage: timeline.iter().copied().min().unwrap_or(0),
            max_coverage: timeline.iter().copied().max().unwrap_or(0),
            avg_coverage,
        }
    }
}

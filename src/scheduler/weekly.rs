//! Multi-day scheduling: days-off planning, weekly caps, fairness.
//!
//! The coordinator plans days off per associate up front (pattern ∩
//! availability, seed-staggered so off-days spread across the roster),
//! then solves the days in order. Days are not independent — weekly hour
//! caps couple them — so per-associate running totals thread through the
//! daily solves and clamp each day's effective limit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::models::{
    Associate, DaySchedule, DaysOffPattern, FairnessMetrics, WeeklySchedule,
    WeeklyScheduleRequest,
};
use crate::policies::{
    BreakPolicy, DefaultBreakPolicy, DefaultLunchPolicy, DefaultShiftPolicy, LunchPolicy,
    ShiftPolicy,
};
use crate::solver::candidates::CandidateGenerator;
use crate::solver::heuristic::HeuristicSolver;

/// Running weekly totals for one associate.
#[derive(Debug, Clone, Default)]
pub(crate) struct WeeklyState {
    pub minutes_scheduled: u32,
    pub days_worked: u32,
}

/// Plans which dates each associate takes off so the configured pattern
/// holds before any day is solved.
#[derive(Debug, Clone)]
pub struct DaysOffPlanner {
    pattern: DaysOffPattern,
    required_days_off: u32,
}

impl DaysOffPlanner {
    /// Creates a planner.
    pub fn new(pattern: DaysOffPattern, required_days_off: u32) -> Self {
        Self {
            pattern,
            required_days_off,
        }
    }

    /// Full set of off dates for one associate: availability off-days plus
    /// the dates forced off to satisfy the pattern and the required count.
    ///
    /// The rng staggers equivalent choices across associates so the whole
    /// roster is not off on the same days.
    pub fn plan(
        &self,
        associate: &Associate,
        dates: &[NaiveDate],
        rng: &mut StdRng,
    ) -> BTreeSet<NaiveDate> {
        let mut off: BTreeSet<NaiveDate> = dates
            .iter()
            .copied()
            .filter(|&d| associate.availability_on(d).is_off())
            .collect();

        match self.pattern {
            DaysOffPattern::None => {}
            DaysOffPattern::TwoConsecutive => {
                if !contains_consecutive_pair(&off) {
                    let pairs: Vec<(NaiveDate, NaiveDate)> = dates
                        .windows(2)
                        .filter(|pair| is_next_day(pair[0], pair[1]))
                        .map(|pair| (pair[0], pair[1]))
                        .collect();
                    if !pairs.is_empty() {
                        // Prefer pairs that reuse existing off-days.
                        let best = pairs
                            .iter()
                            .map(|&(a, b)| {
                                off.contains(&a) as usize + off.contains(&b) as usize
                            })
                            .max()
                            .unwrap_or(0);
                        let tied: Vec<_> = pairs
                            .iter()
                            .filter(|&&(a, b)| {
                                off.contains(&a) as usize + off.contains(&b) as usize == best
                            })
                            .collect();
                        let &&(a, b) = &tied[rng.gen_range(0..tied.len())];
                        off.insert(a);
                        off.insert(b);
                    }
                }
            }
            DaysOffPattern::OneWeekendDay => {
                let weekends: Vec<NaiveDate> =
                    dates.iter().copied().filter(|&d| is_weekend(d)).collect();
                if !weekends.is_empty() && !off.iter().any(|&d| is_weekend(d)) {
                    off.insert(weekends[rng.gen_range(0..weekends.len())]);
                }
            }
            DaysOffPattern::EveryOtherDay => {
                let offset = rng.gen_range(0..2usize);
                for (i, &date) in dates.iter().enumerate() {
                    if i % 2 == offset {
                        off.insert(date);
                    }
                }
            }
        }

        // Top up to the required count from the remaining working dates.
        let mut working: Vec<NaiveDate> = dates
            .iter()
            .copied()
            .filter(|d| !off.contains(d))
            .collect();
        while (off.len() as u32) < self.required_days_off && !working.is_empty() {
            let picked = working.remove(rng.gen_range(0..working.len()));
            off.insert(picked);
        }

        off
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_next_day(a: NaiveDate, b: NaiveDate) -> bool {
    a.checked_add_days(Days::new(1)) == Some(b)
}

fn contains_consecutive_pair(dates: &BTreeSet<NaiveDate>) -> bool {
    let sorted: Vec<_> = dates.iter().copied().collect();
    sorted.windows(2).any(|pair| is_next_day(pair[0], pair[1]))
}

/// Plans days off for every associate in request order.
pub(crate) fn plan_all_days_off(
    request: &WeeklyScheduleRequest,
    dates: &[NaiveDate],
) -> HashMap<String, BTreeSet<NaiveDate>> {
    let planner = DaysOffPlanner::new(request.days_off_pattern, request.required_days_off);
    let mut rng = StdRng::seed_from_u64(request.seed);
    request
        .associates
        .iter()
        .map(|associate| (associate.id.clone(), planner.plan(associate, dates, &mut rng)))
        .collect()
}

/// Builds the day's roster: planned-off and weekly-capped associates are
/// excluded, and each remaining associate's daily limit is clamped to
/// their remaining weekly minutes.
pub(crate) fn build_roster(
    request: &WeeklyScheduleRequest,
    date: NaiveDate,
    planned_off: &HashMap<String, BTreeSet<NaiveDate>>,
    states: &HashMap<String, WeeklyState>,
    min_work_minutes: u32,
) -> Vec<Associate> {
    let mut roster = Vec::new();
    for associate in &request.associates {
        if associate.availability_on(date).is_off() {
            continue;
        }
        if planned_off
            .get(&associate.id)
            .is_some_and(|off| off.contains(&date))
        {
            continue;
        }
        let scheduled = states
            .get(&associate.id)
            .map(|s| s.minutes_scheduled)
            .unwrap_or(0);
        let remaining = associate.max_minutes_per_week.saturating_sub(scheduled);
        if remaining < min_work_minutes {
            debug!(associate = %associate.id, %date, "weekly cap reached");
            continue;
        }
        let mut adjusted = associate.clone();
        adjusted.max_minutes_per_day = associate.max_minutes_per_day.min(remaining);
        roster.push(adjusted);
    }
    roster
}

/// Per-associate scheduling bias from the fairness config:
/// `α·(target − minutes_so_far)/target + β·(required_off − days_worked)/days`.
pub(crate) fn fairness_bias(
    request: &WeeklyScheduleRequest,
    states: &HashMap<String, WeeklyState>,
    num_days: usize,
) -> HashMap<String, f64> {
    let fairness = &request.fairness;
    let days = num_days.max(1) as f64;
    request
        .associates
        .iter()
        .map(|associate| {
            let state = states.get(&associate.id).cloned().unwrap_or_default();
            let target = fairness
                .target_weekly_minutes
                .unwrap_or(associate.max_minutes_per_week)
                .max(1) as f64;
            let hours_term = fairness.weight_hours_balance
                * (target - state.minutes_scheduled as f64)
                / target;
            let days_term = fairness.weight_days_balance
                * (request.required_days_off as f64 - state.days_worked as f64)
                / days;
            (associate.id.clone(), hours_term + days_term)
        })
        .collect()
}

/// Folds a solved day into the running weekly totals.
pub(crate) fn update_states(
    schedule: &DaySchedule,
    states: &mut HashMap<String, WeeklyState>,
) {
    for (id, assignment) in &schedule.assignments {
        let state = states.entry(id.clone()).or_default();
        state.minutes_scheduled += assignment.work_minutes(&schedule.grid);
        state.days_worked += 1;
    }
}

/// Fairness metrics over the final weekly totals.
pub(crate) fn metrics_from_states(
    request: &WeeklyScheduleRequest,
    states: &HashMap<String, WeeklyState>,
) -> FairnessMetrics {
    let mut minutes = BTreeMap::new();
    let mut days = BTreeMap::new();
    for associate in &request.associates {
        let state = states.get(&associate.id).cloned().unwrap_or_default();
        minutes.insert(associate.id.clone(), state.minutes_scheduled);
        days.insert(associate.id.clone(), state.days_worked);
    }
    FairnessMetrics::calculate(minutes, days)
}

/// Multi-day scheduler over the heuristic solver.
#[derive(Debug, Clone)]
pub struct WeeklyScheduler {
    shift_policy: Arc<dyn ShiftPolicy>,
    lunch_policy: Arc<dyn LunchPolicy>,
    break_policy: Arc<dyn BreakPolicy>,
    generator: CandidateGenerator,
    solver: HeuristicSolver,
}

impl Default for WeeklyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl WeeklyScheduler {
    /// Creates a weekly scheduler with default policies.
    pub fn new() -> Self {
        Self::with_policies(
            Arc::new(DefaultShiftPolicy::default()),
            Arc::new(DefaultLunchPolicy::default()),
            Arc::new(DefaultBreakPolicy::default()),
        )
    }

    /// Creates a weekly scheduler over explicit policies.
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

    fn validate_config(&self, request: &WeeklyScheduleRequest) -> Result<(), ConfigError> {
        request.validate()?;
        self.shift_policy.validate()?;
        self.lunch_policy.validate()?;
        self.break_policy.validate()?;
        Ok(())
    }

    /// Generates a complete weekly schedule.
    pub fn generate(&self, request: &WeeklyScheduleRequest) -> Result<WeeklySchedule, ConfigError> {
        self.validate_config(request)?;

        let dates = request.dates();
        let planned_off = plan_all_days_off(request, &dates);
        let mut states: HashMap<String, WeeklyState> = HashMap::new();
        let mut weekly = WeeklySchedule::new(request.start_date, request.end_date);

        for &date in &dates {
            let roster = build_roster(
                request,
                date,
                &planned_off,
                &states,
                self.shift_policy.min_work_minutes(),
            );
            let day_request = request.day_request(date, roster);
            let schedule = if day_request.associates.is_empty() {
                DaySchedule::new(date, request.grid)
            } else {
                let bias = fairness_bias(request, &states, dates.len());
                let candidates = self.generator.generate_all(&day_request);
                let lookup = super::daily::associates_by_id(&day_request);
                self.solver
                    .solve_with(&day_request, &candidates, &lookup, None, Some(&bias))
            };

            update_states(&schedule, &mut states);
            weekly.days.insert(date, schedule);
        }

        weekly.fairness = Some(metrics_from_states(request, &states));
        info!(
            start = %request.start_date,
            end = %request.end_date,
            shifts = weekly.total_shifts(),
            "weekly schedule generated"
        );
        Ok(weekly)
    }
}

//! Demand-aware weekly scheduling.
//!
//! Extends the weekly coordinator with per-day demand curves, solver
//! dispatch (heuristic, exact, or hybrid with fallback), and demand-match
//! metrics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::demand::{DemandCurve, DemandMetrics, WeeklyDemand};
use crate::error::ConfigError;
use crate::models::{DaySchedule, WeeklySchedule, WeeklyScheduleRequest};
use crate::policies::{
    BreakPolicy, DefaultBreakPolicy, DefaultLunchPolicy, DefaultShiftPolicy, LunchPolicy,
    ShiftPolicy,
};
use crate::scheduler::weekly::{
    build_roster, fairness_bias, metrics_from_states, plan_all_days_off, update_states,
    WeeklyState,
};
use crate::solver::candidates::CandidateGenerator;
use crate::solver::cp::CpSatSolver;
use crate::solver::heuristic::HeuristicSolver;
use crate::solver::{SolverConfig, SolverStatus, SolverType};

/// Configuration for demand-aware scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandAwareConfig {
    /// Which solver runs each day.
    pub solver_type: SolverType,
    /// Exact-solver configuration (time limit, mode, weights).
    pub solver_config: SolverConfig,
    /// Synthesize a standard week of demand when none is supplied.
    pub auto_generate_demand: bool,
    /// Compute per-day demand metrics.
    pub track_demand_metrics: bool,
}

impl Default for DemandAwareConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::default(),
            solver_config: SolverConfig::default(),
            auto_generate_demand: true,
            track_demand_metrics: true,
        }
    }
}

/// Result of a demand-aware weekly solve.
#[derive(Debug, Clone)]
pub struct WeeklyResult {
    /// The generated schedule.
    pub schedule: WeeklySchedule,
    /// Per-day match metrics (dates with a demand curve only).
    pub demand_metrics: BTreeMap<NaiveDate, DemandMetrics>,
    /// Per-day exact-solver outcomes (dates where the exact solver ran).
    pub solver_statuses: BTreeMap<NaiveDate, SolverStatus>,
    /// Mean of the per-day match scores (100 when no demand was tracked).
    pub overall_match_score: f64,
}

/// Weekly scheduler with demand matching and solver dispatch.
#[derive(Debug)]
pub struct DemandAwareScheduler {
    shift_policy: Arc<dyn ShiftPolicy>,
    lunch_policy: Arc<dyn LunchPolicy>,
    break_policy: Arc<dyn BreakPolicy>,
    generator: CandidateGenerator,
    heuristic: HeuristicSolver,
    exact: CpSatSolver,
    config: DemandAwareConfig,
}

impl Default for DemandAwareScheduler {
    fn default() -> Self {
        Self::new(DemandAwareConfig::default())
    }
}

impl DemandAwareScheduler {
    /// Creates a scheduler with default policies.
    pub fn new(config: DemandAwareConfig) -> Self {
        Self::with_policies(
            Arc::new(DefaultShiftPolicy::default()),
            Arc::new(DefaultLunchPolicy::default()),
            Arc::new(DefaultBreakPolicy::default()),
            config,
        )
    }

    /// Creates a scheduler over explicit policies.
    pub fn with_policies(
        shift_policy: Arc<dyn ShiftPolicy>,
        lunch_policy: Arc<dyn LunchPolicy>,
        break_policy: Arc<dyn BreakPolicy>,
        config: DemandAwareConfig,
    ) -> Self {
        let generator = CandidateGenerator::with_policies(
            shift_policy.clone(),
            lunch_policy.clone(),
            break_policy.clone(),
        );
        let heuristic =
            HeuristicSolver::with_policies(lunch_policy.clone(), break_policy.clone());
        let exact = CpSatSolver::new(config.solver_config.clone());
        Self {
            shift_policy,
            lunch_policy,
            break_policy,
            generator,
            heuristic,
            exact,
            config,
        }
    }

    fn validate_config(&self, request: &WeeklyScheduleRequest) -> Result<(), ConfigError> {
        request.validate()?;
        self.shift_policy.validate()?;
        self.lunch_policy.validate()?;
        self.break_policy.validate()?;
        Ok(())
    }

    /// Generates a demand-aware weekly schedule.
    pub fn generate(
        &self,
        request: &WeeklyScheduleRequest,
        demand: &WeeklyDemand,
    ) -> Result<WeeklyResult, ConfigError> {
        self.validate_config(request)?;

        let dates = request.dates();
        let effective_demand = self.resolve_demand(request, demand, &dates);
        let planned_off = plan_all_days_off(request, &dates);
        let mut states: HashMap<String, WeeklyState> = HashMap::new();
        let mut weekly = WeeklySchedule::new(request.start_date, request.end_date);
        let mut demand_metrics = BTreeMap::new();
        let mut solver_statuses = BTreeMap::new();

        for &date in &dates {
            let curve = effective_demand.curve_for(date, &request.grid);
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
                self.solve_day(
                    &day_request,
                    curve.as_ref(),
                    &states,
                    request,
                    dates.len(),
                    &mut solver_statuses,
                )
            };

            if self.config.track_demand_metrics {
                if let Some(curve) = &curve {
                    demand_metrics.insert(
                        date,
                        DemandMetrics::calculate(
                            curve,
                            &schedule.coverage_timeline(),
                            request.grid.slot_minutes,
                        ),
                    );
                }
            }

            update_states(&schedule, &mut states);
            weekly.days.insert(date, schedule);
        }

        weekly.fairness = Some(metrics_from_states(request, &states));

        let overall_match_score = if demand_metrics.is_empty() {
            100.0
        } else {
            demand_metrics.values().map(|m| m.match_score).sum::<f64>()
                / demand_metrics.len() as f64
        };
        info!(
            start = %request.start_date,
            end = %request.end_date,
            overall_match_score,
            "demand-aware weekly schedule generated"
        );

        Ok(WeeklyResult {
            schedule: weekly,
            demand_metrics,
            solver_statuses,
            overall_match_score,
        })
    }

    fn resolve_demand(
        &self,
        request: &WeeklyScheduleRequest,
        demand: &WeeklyDemand,
        dates: &[NaiveDate],
    ) -> WeeklyDemand {
        let has_any = !demand.curves.is_empty() || demand.default_profile.is_some();
        if has_any || !self.config.auto_generate_demand {
            return demand.clone();
        }
        WeeklyDemand::standard_week(&request.grid, dates, request.associates.len())
    }

    fn solve_day(
        &self,
        day_request: &crate::models::ScheduleRequest,
        curve: Option<&DemandCurve>,
        states: &HashMap<String, WeeklyState>,
        request: &WeeklyScheduleRequest,
        num_days: usize,
        solver_statuses: &mut BTreeMap<NaiveDate, SolverStatus>,
    ) -> DaySchedule {
        let candidates = self.generator.generate_all(day_request);
        let lookup = super::daily::associates_by_id(day_request);
        let bias = fairness_bias(request, states, num_days);

        match self.config.solver_type {
            SolverType::Heuristic => {
                self.heuristic
                    .solve_with(day_request, &candidates, &lookup, curve, Some(&bias))
            }
            SolverType::CpSat => {
                let result = self.exact.solve(day_request, &candidates, &lookup, curve);
                solver_statuses.insert(day_request.date, result.status);
                match result.schedule {
                    Some(schedule) => schedule,
                    None => {
                        // Pure exact mode returns the empty day with its
                        // status rather than falling back.
                        warn!(date = %day_request.date, status = ?result.status, "exact solve produced no schedule");
                        let mut empty = DaySchedule::new(day_request.date, day_request.grid);
                        crate::solver::roles::record_unscheduled(&mut empty, day_request);
                        empty
                    }
                }
            }
            SolverType::Hybrid => {
                let result = self.exact.solve(day_request, &candidates, &lookup, curve);
                solver_statuses.insert(day_request.date, result.status);
                match result.schedule {
                    Some(schedule) => schedule,
                    None => {
                        info!(date = %day_request.date, status = ?result.status, "falling back to heuristic");
                        self.heuristic.solve_with(
                            day_request,
                            &candidates,
                            &lookup,
                            curve,
                            Some(&bias),
                        )
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Associate, Availability};
    use crate::validation::ScheduleValidator;
    use chrono::Days;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn week_associate(id: &str, days: u64) -> Associate {
        let mut associate = Associate::new(id, id);
        for i in 0..days {
            let date = d("2026-08-03").checked_add_days(Days::new(i)).unwrap();
            associate = associate.with_availability(date, Availability::new(0, 68));
        }
        associate
    }

    fn lookup(request: &WeeklyScheduleRequest) -> HashMap<String, Associate> {
        request
            .associates
            .iter()
            .map(|a| (a.id.clone(), a.clone()))
            .collect()
    }

    #[test]
    fn test_heuristic_demand_week_validates() {
        let associates: Vec<Associate> =
            (0..4).map(|i| week_associate(&format!("A{i}"), 7)).collect();
        let request =
            WeeklyScheduleRequest::new(d("2026-08-03"), d("2026-08-09"), associates).with_seed(2);

        let config = DemandAwareConfig {
            solver_type: SolverType::Heuristic,
            ..Default::default()
        };
        let result = DemandAwareScheduler::new(config)
            .generate(&request, &WeeklyDemand::new())
            .unwrap();

        // Auto-generated demand covers every day.
        assert_eq!(result.demand_metrics.len(), 7);
        assert!(result.overall_match_score > 0.0);
        assert!(result.overall_match_score <= 100.0);
        assert!(result.solver_statuses.is_empty());

        let validation = ScheduleValidator::new().validate_weekly(
            &result.schedule,
            &request,
            &lookup(&request),
        );
        assert!(validation.is_valid, "violations: {:?}", validation.violations);
    }

    #[test]
    fn test_hybrid_falls_back_on_timeout() {
        let associates: Vec<Associate> =
            (0..2).map(|i| week_associate(&format!("A{i}"), 2)).collect();
        let request = WeeklyScheduleRequest::new(d("2026-08-03"), d("2026-08-04"), associates)
            .with_days_off_pattern(crate::models::DaysOffPattern::None)
            .with_required_days_off(0)
            .with_seed(4);

        // Zero time limit: the exact solver times out every day and the
        // heuristic takes over.
        let config = DemandAwareConfig {
            solver_type: SolverType::Hybrid,
            solver_config: SolverConfig::default().with_time_limit(0.0),
            ..Default::default()
        };
        let result = DemandAwareScheduler::new(config)
            .generate(&request, &WeeklyDemand::new())
            .unwrap();

        assert!(result
            .solver_statuses
            .values()
            .all(|&s| s == SolverStatus::Timeout));
        // Fallback still produced shifts.
        assert!(result.schedule.total_shifts() > 0);
    }

    #[test]
    fn test_pure_cpsat_timeout_leaves_days_empty() {
        let associates = vec![week_associate("A1", 1)];
        let request = WeeklyScheduleRequest::new(d("2026-08-03"), d("2026-08-03"), associates)
            .with_days_off_pattern(crate::models::DaysOffPattern::None)
            .with_required_days_off(0)
            .with_seed(4);

        let config = DemandAwareConfig {
            solver_type: SolverType::CpSat,
            solver_config: SolverConfig::default().with_time_limit(0.0),
            ..Default::default()
        };
        let result = DemandAwareScheduler::new(config)
            .generate(&request, &WeeklyDemand::new())
            .unwrap();

        assert_eq!(result.solver_statuses[&d("2026-08-03")], SolverStatus::Timeout);
        assert_eq!(result.schedule.total_shifts(), 0);
        // The associate is surfaced as unscheduled rather than silently lost.
        let day = &result.schedule.days[&d("2026-08-03")];
        assert_eq!(day.unscheduled, vec!["A1".to_string()]);
    }

    #[test]
    fn test_explicit_demand_is_used() {
        let associates = vec![week_associate("A1", 1)];
        let request = WeeklyScheduleRequest::new(d("2026-08-03"), d("2026-08-03"), associates)
            .with_days_off_pattern(crate::models::DaysOffPattern::None)
            .with_required_days_off(0)
            .with_seed(0);

        let demand = WeeklyDemand::new().with_curve(
            d("2026-08-03"),
            DemandCurve::constant(request.grid.total_slots(), 1),
        );
        let config = DemandAwareConfig {
            solver_type: SolverType::Heuristic,
            ..Default::default()
        };
        let result = DemandAwareScheduler::new(config)
            .generate(&request, &demand)
            .unwrap();

        let metrics = &result.demand_metrics[&d("2026-08-03")];
        // One associate against flat demand 1: a healthy share of the 68
        // target slot-units is matched by a single 8-hour shift.
        assert!(metrics.match_score > 35.0);
        assert!(metrics.undercoverage_minutes > 0.0);
    }

    #[test]
    fn test_determinism() {
        let associates: Vec<Associate> =
            (0..3).map(|i| week_associate(&format!("A{i}"), 7)).collect();
        let request =
            WeeklyScheduleRequest::new(d("2026-08-03"), d("2026-08-09"), associates).with_seed(8);
        let config = DemandAwareConfig {
            solver_type: SolverType::Heuristic,
            ..Default::default()
        };

        let first = DemandAwareScheduler::new(config.clone())
            .generate(&request, &WeeklyDemand::new())
            .unwrap();
        let second = DemandAwareScheduler::new(config)
            .generate(&request, &WeeklyDemand::new())
            .unwrap();
        assert_eq!(first.schedule, second.schedule);
        assert_eq!(first.overall_match_score, second.overall_match_score);
    }
}

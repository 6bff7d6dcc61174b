//! Constraint-programming formulation and exact solver.
//!
//! The scheduling problem is recast as a 0/1 selection model over the
//! precomputed candidates:
//!
//! - `x[a,k] ∈ {0,1}` — associate `a` works candidate `k`, with
//!   `Σ_k x[a,k] ≤ 1` per associate;
//! - `on[a,t]` — derived from the chosen candidate's on-floor mask;
//! - per-slot role-capacity feasibility for associates whose eligible set
//!   has no overflow role (concrete role variables are eliminated by
//!   decomposition: the shared role assigner produces them from the
//!   selection at interpretation time);
//! - objective `Σ_t [cov·on(t) + dem·match(t) − under·deficit(t) −
//!   over·surplus(t)] − ε·preference penalties`, weights per
//!   [`ObjectiveWeights`].
//!
//! The engine seam is the [`CpSolver`] trait; the bundled
//! [`BranchBoundCpSolver`] is a deterministic depth-first branch-and-bound
//! with admissible per-associate bounds and a cooperative wall-clock
//! deadline. Swap in a different engine by implementing the trait.
//!
//! # Reference
//! Baptiste et al. (2001), "Constraint-Based Scheduling"

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::demand::DemandCurve;
use crate::models::{Associate, DaySchedule, JobRole, ScheduleRequest, ShiftAssignment};
use crate::solver::candidates::ShiftCandidate;
use crate::solver::roles::{assign_roles, record_unscheduled, RoleCounts};
use crate::solver::{ObjectiveWeights, SolverConfig, SolverStatus};

/// One candidate in the model.
#[derive(Debug, Clone)]
pub struct CpCandidate {
    /// Index into the associate's original candidate list.
    pub index: usize,
    /// On-floor slots (the candidate's mask).
    pub mask: Vec<usize>,
    /// Optimistic upper bound on this candidate's marginal objective gain.
    pub bound: i64,
}

/// One associate in the model.
#[derive(Debug, Clone)]
pub struct CpAssociate {
    /// Associate id.
    pub id: String,
    /// Candidates sorted by descending bound (then original index).
    pub candidates: Vec<CpCandidate>,
    /// Whether the associate lacks an overflow role, making per-slot role
    /// capacity a binding constraint on their presence.
    pub restricted: bool,
    /// Dense per-role eligibility flags.
    pub eligible: [bool; JobRole::ALL.len()],
    /// Soft-preference bonus applied once when the associate works.
    pub preference_bonus: i64,
}

/// The 0/1 selection model.
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Slots per day.
    pub total_slots: usize,
    /// Per-slot demand targets (zero without a curve).
    pub demand: Vec<u32>,
    /// Objective weights.
    pub weights: ObjectiveWeights,
    /// Dense per-role caps.
    pub job_caps: [u32; JobRole::ALL.len()],
    /// Associates in request order.
    pub associates: Vec<CpAssociate>,
    /// `suffix_bounds[i]` bounds the gain attainable from associates `i..`.
    suffix_bounds: Vec<i64>,
    /// Objective value of the empty selection.
    base_value: i64,
}

impl CpModel {
    /// Builds the model from a request and precomputed candidates.
    pub fn build(
        request: &ScheduleRequest,
        candidates: &HashMap<String, Vec<ShiftCandidate>>,
        associates_by_id: &HashMap<String, Associate>,
        demand: Option<&DemandCurve>,
        weights: ObjectiveWeights,
    ) -> Self {
        let total_slots = request.grid.total_slots();
        let demand_vec: Vec<u32> = (0..total_slots)
            .map(|slot| demand.map(|d| d.target_at(slot)).unwrap_or(0))
            .collect();

        // Without a curve the demand terms have nothing to reference;
        // coverage alone drives the objective.
        let weights = if demand.is_none() {
            ObjectiveWeights {
                coverage: weights.coverage.max(1),
                demand: 0,
                undercoverage: 0,
                overcoverage: 0,
                soft_preference: weights.soft_preference,
            }
        } else {
            weights
        };

        let mut job_caps = [0u32; JobRole::ALL.len()];
        for role in JobRole::ALL {
            job_caps[role.index()] = request.job_cap(role);
        }

        // Per-slot optimistic gain of adding one head: coverage always,
        // match and deficit relief only where demand exists.
        let slot_bound: Vec<i64> = demand_vec
            .iter()
            .map(|&d| {
                let mut bound = weights.coverage;
                if d > 0 {
                    bound += weights.demand + weights.undercoverage;
                }
                bound
            })
            .collect();

        let mut model_associates = Vec::new();
        for associate in &request.associates {
            let Some(list) = candidates.get(&associate.id) else {
                continue;
            };
            let Some(info) = associates_by_id.get(&associate.id) else {
                continue;
            };

            let eligible_set = info.eligible_roles();
            let mut eligible = [false; JobRole::ALL.len()];
            for role in &eligible_set {
                eligible[role.index()] = true;
            }
            let restricted = !eligible_set.contains(&JobRole::Picking);

            let preference_bonus: i64 = eligible_set
                .iter()
                .map(|&role| match info.preference_for(role) {
                    crate::models::Preference::Prefer => weights.soft_preference,
                    crate::models::Preference::Avoid => -weights.soft_preference,
                    crate::models::Preference::Neutral => 0,
                })
                .sum();

            let mut cp_candidates: Vec<CpCandidate> = list
                .iter()
                .enumerate()
                .map(|(index, candidate)| {
                    let mask = candidate.on_floor_slots();
                    let bound = mask.iter().map(|&s| slot_bound[s]).sum::<i64>()
                        + preference_bonus.max(0);
                    CpCandidate { index, mask, bound }
                })
                .collect();
            cp_candidates.sort_by(|a, b| b.bound.cmp(&a.bound).then(a.index.cmp(&b.index)));

            model_associates.push(CpAssociate {
                id: associate.id.clone(),
                candidates: cp_candidates,
                restricted,
                eligible,
                preference_bonus,
            });
        }

        let mut suffix_bounds = vec![0i64; model_associates.len() + 1];
        for i in (0..model_associates.len()).rev() {
            let best = model_associates[i]
                .candidates
                .iter()
                .map(|c| c.bound)
                .max()
                .unwrap_or(0)
                .max(0);
            suffix_bounds[i] = suffix_bounds[i + 1] + best;
        }

        let base_value = -(weights.undercoverage
            * demand_vec.iter().map(|&d| d as i64).sum::<i64>());

        Self {
            total_slots,
            demand: demand_vec,
            weights,
            job_caps,
            associates: model_associates,
            suffix_bounds,
            base_value,
        }
    }

    /// Marginal objective gain of adding `mask` on top of `coverage`.
    fn marginal_gain(&self, mask: &[usize], coverage: &[u32]) -> i64 {
        let mut gain = 0i64;
        for &slot in mask {
            let demand = self.demand[slot];
            gain += self.weights.coverage;
            if coverage[slot] < demand {
                gain += self.weights.demand + self.weights.undercoverage;
            } else {
                gain -= self.weights.overcoverage;
            }
        }
        gain
    }
}

/// A solution to a [`CpModel`].
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Search outcome.
    pub status: SolverStatus,
    /// Objective of the best selection found.
    pub objective: i64,
    /// Chosen candidate index per model associate (`None` = unscheduled).
    pub selection: Vec<Option<usize>>,
    /// Search nodes explored.
    pub nodes: u64,
    /// Wall-clock time spent.
    pub elapsed_seconds: f64,
}

/// An engine that can solve a [`CpModel`].
pub trait CpSolver: Send + Sync + Debug {
    /// Solves the model under the config's time limit.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

/// Deterministic depth-first branch-and-bound engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchBoundCpSolver;

/// Search nodes granted per second of time limit. The node budget is the
/// primary limiter so identical inputs explore an identical tree; the
/// wall-clock deadline is the cooperative backstop.
const NODES_PER_SECOND: f64 = 200_000.0;

struct SearchState<'a> {
    model: &'a CpModel,
    deadline: Instant,
    node_budget: u64,
    coverage: Vec<u32>,
    restricted_members: Vec<Vec<u16>>,
    current: Vec<Option<usize>>,
    best: Vec<Option<usize>>,
    best_value: i64,
    improved: bool,
    nodes: u64,
    timed_out: bool,
}

impl CpSolver for BranchBoundCpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let budget = if config.time_limit_seconds > 0.0 {
            Duration::from_secs_f64(config.time_limit_seconds)
        } else {
            Duration::ZERO
        };

        let count = model.associates.len();
        let mut state = SearchState {
            model,
            deadline: started + budget,
            node_budget: (config.time_limit_seconds.max(0.0) * NODES_PER_SECOND) as u64,
            coverage: vec![0; model.total_slots],
            restricted_members: vec![Vec::new(); model.total_slots],
            current: vec![None; count],
            best: vec![None; count],
            best_value: model.base_value,
            improved: false,
            nodes: 0,
            timed_out: false,
        };

        state.descend(0, model.base_value);

        let status = if !state.timed_out {
            SolverStatus::Optimal
        } else if state.improved {
            SolverStatus::Feasible
        } else {
            SolverStatus::Timeout
        };
        debug!(
            ?status,
            nodes = state.nodes,
            objective = state.best_value,
            "branch-and-bound finished"
        );

        CpSolution {
            status,
            objective: state.best_value,
            selection: state.best,
            nodes: state.nodes,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        }
    }
}

impl SearchState<'_> {
    fn descend(&mut self, depth: usize, value: i64) {
        self.nodes += 1;
        if self.timed_out
            || self.nodes > self.node_budget
            || (self.nodes % 1024 == 0 && Instant::now() >= self.deadline)
        {
            self.timed_out = true;
            return;
        }

        if depth == self.model.associates.len() {
            if value > self.best_value {
                self.best_value = value;
                self.best.copy_from_slice(&self.current);
                self.improved = true;
            }
            return;
        }

        // Prune: even the optimistic remainder cannot beat the incumbent.
        if value + self.model.suffix_bounds[depth] <= self.best_value {
            return;
        }

        let candidate_count = self.model.associates[depth].candidates.len();
        for position in 0..candidate_count {
            if self.timed_out {
                return;
            }
            let candidate = &self.model.associates[depth].candidates[position];
            if value + candidate.bound.max(0) + self.model.suffix_bounds[depth + 1]
                <= self.best_value
            {
                // Candidates are bound-sorted; nothing later can help.
                break;
            }
            if !self.fits(depth, position) {
                continue;
            }

            let gain = {
                let candidate = &self.model.associates[depth].candidates[position];
                self.model.marginal_gain(&candidate.mask, &self.coverage)
                    + self.model.associates[depth].preference_bonus
            };
            self.apply(depth, position);
            self.current[depth] = Some(position);
            self.descend(depth + 1, value + gain);
            self.current[depth] = None;
            self.unapply(depth, position);
        }

        if !self.timed_out {
            // The skip branch: leave this associate unscheduled.
            self.descend(depth + 1, value);
        }
    }

    /// Role-capacity feasibility of adding this candidate.
    ///
    /// Associates with an overflow role always fit under default caps; for
    /// restricted associates every mask slot must admit a role assignment
    /// for the whole restricted group present there.
    fn fits(&self, depth: usize, position: usize) -> bool {
        let associate = &self.model.associates[depth];
        if !associate.restricted {
            return true;
        }
        let candidate = &associate.candidates[position];
        candidate.mask.iter().all(|&slot| {
            let mut group: Vec<u16> = self.restricted_members[slot].clone();
            group.push(depth as u16);
            self.restricted_group_fits(&group)
        })
    }

    /// Greedy feasibility check: members (fewest eligible roles first)
    /// each take the eligible role with the most remaining capacity.
    fn restricted_group_fits(&self, group: &[u16]) -> bool {
        let mut remaining = self.model.job_caps;
        let mut members: Vec<u16> = group.to_vec();
        members.sort_by_key(|&m| {
            let eligible = &self.model.associates[m as usize].eligible;
            eligible.iter().filter(|&&e| e).count()
        });
        for member in members {
            let eligible = &self.model.associates[member as usize].eligible;
            let slot = JobRole::ALL
                .into_iter()
                .filter(|role| eligible[role.index()] && remaining[role.index()] > 0)
                .max_by_key(|role| remaining[role.index()]);
            match slot {
                Some(role) => remaining[role.index()] -= 1,
                None => return false,
            }
        }
        true
    }

    fn apply(&mut self, depth: usize, position: usize) {
        let restricted = self.model.associates[depth].restricted;
        let mask = self.model.associates[depth].candidates[position].mask.clone();
        for slot in mask {
            self.coverage[slot] += 1;
            if restricted {
                self.restricted_members[slot].push(depth as u16);
            }
        }
    }

    fn unapply(&mut self, depth: usize, position: usize) {
        let restricted = self.model.associates[depth].restricted;
        let mask = self.model.associates[depth].candidates[position].mask.clone();
        for slot in mask {
            self.coverage[slot] -= 1;
            if restricted {
                let members = &mut self.restricted_members[slot];
                if let Some(found) = members.iter().rposition(|&m| m as usize == depth) {
                    members.swap_remove(found);
                }
            }
        }
    }
}

/// Result of a CP-backed daily solve.
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// The schedule, when the solve produced one.
    pub schedule: Option<DaySchedule>,
    /// Search outcome.
    pub status: SolverStatus,
    /// Objective of the returned selection.
    pub objective_value: i64,
    /// Wall-clock solve time.
    pub solve_time_seconds: f64,
    /// Search nodes explored.
    pub nodes_explored: u64,
}

impl SolverResult {
    /// Whether a usable schedule came back.
    pub fn is_feasible(&self) -> bool {
        self.status.has_solution() && self.schedule.is_some()
    }
}

/// Adapter that builds the model, runs an engine, and interprets the
/// solution back into the shared data model.
#[derive(Debug)]
pub struct CpSatSolver {
    config: SolverConfig,
    engine: Box<dyn CpSolver>,
}

impl Default for CpSatSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl CpSatSolver {
    /// Creates an adapter with the bundled branch-and-bound engine.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            engine: Box::new(BranchBoundCpSolver),
        }
    }

    /// Creates an adapter over a custom engine.
    pub fn with_engine(config: SolverConfig, engine: Box<dyn CpSolver>) -> Self {
        Self { config, engine }
    }

    /// Solves one day. On `Timeout` (or a hypothetical infeasibility) the
    /// result carries no schedule and the caller decides the fallback.
    pub fn solve(
        &self,
        request: &ScheduleRequest,
        candidates: &HashMap<String, Vec<ShiftCandidate>>,
        associates_by_id: &HashMap<String, Associate>,
        demand: Option<&DemandCurve>,
    ) -> SolverResult {
        let weights = self.config.weights();
        let model = CpModel::build(request, candidates, associates_by_id, demand, weights);
        let solution = self.engine.solve(&model, &self.config);
        info!(
            status = ?solution.status,
            objective = solution.objective,
            nodes = solution.nodes,
            "cp solve finished"
        );

        let schedule = solution.status.has_solution().then(|| {
            self.interpret(request, candidates, associates_by_id, &model, &solution)
        });

        SolverResult {
            schedule,
            status: solution.status,
            objective_value: solution.objective,
            solve_time_seconds: solution.elapsed_seconds,
            nodes_explored: solution.nodes,
        }
    }

    fn interpret(
        &self,
        request: &ScheduleRequest,
        candidates: &HashMap<String, Vec<ShiftCandidate>>,
        associates_by_id: &HashMap<String, Associate>,
        model: &CpModel,
        solution: &CpSolution,
    ) -> DaySchedule {
        let mut schedule = DaySchedule::new(request.date, request.grid);
        let mut counts = RoleCounts::new(request.grid.total_slots());

        let mut chosen: Vec<&ShiftCandidate> = Vec::new();
        for (cp_associate, selected) in model.associates.iter().zip(&solution.selection) {
            let Some(position) = selected else {
                continue;
            };
            let index = cp_associate.candidates[*position].index;
            if let Some(candidate) = candidates
                .get(&cp_associate.id)
                .and_then(|list| list.get(index))
            {
                chosen.push(candidate);
            }
        }

        chosen.sort_by(|a, b| {
            a.shift
                .start_slot
                .cmp(&b.shift.start_slot)
                .then_with(|| a.associate_id.cmp(&b.associate_id))
        });

        for candidate in chosen {
            let Some(associate) = associates_by_id.get(&candidate.associate_id) else {
                continue;
            };
            let mut assignment = ShiftAssignment::new(&candidate.associate_id, candidate.shift);
            assignment.lunch = candidate.lunch;
            assignment.breaks = candidate.breaks.clone();
            if assign_roles(&mut assignment, associate, request, &mut counts) {
                schedule.insert(assignment);
            }
        }

        record_unscheduled(&mut schedule, request);
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, ScheduleRequest};
    use crate::solver::candidates::CandidateGenerator;
    use crate::solver::OptimizationMode;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn associate_with_window(id: &str, start: usize, end: usize) -> Associate {
        Associate::new(id, id).with_availability(d("2026-08-03"), Availability::new(start, end))
    }

    fn setup(
        associates: Vec<Associate>,
    ) -> (
        ScheduleRequest,
        HashMap<String, Vec<ShiftCandidate>>,
        HashMap<String, Associate>,
    ) {
        let request = ScheduleRequest::new(d("2026-08-03"), associates);
        let candidates = CandidateGenerator::new().generate_all(&request);
        let map = request
            .associates
            .iter()
            .map(|a| (a.id.clone(), a.clone()))
            .collect();
        (request, candidates, map)
    }

    #[test]
    fn test_small_instance_solves_to_optimal() {
        // Exactly one candidate: a 16-slot window fits only the 4-hour
        // minimum shift.
        let (request, candidates, map) = setup(vec![associate_with_window("A1", 0, 16)]);
        let config = SolverConfig::default().with_mode(OptimizationMode::MaximizeCoverage);
        let result = CpSatSolver::new(config).solve(&request, &candidates, &map, None);

        assert_eq!(result.status, SolverStatus::Optimal);
        let schedule = result.schedule.expect("schedule");
        assert!(schedule.assignments.contains_key("A1"));
        assert!(result.objective_value > 0);
    }

    #[test]
    fn test_match_demand_declines_redundant_shift() {
        // Two associates share one 16-slot window; demand is 1. Scheduling
        // the second only adds overcoverage, so the optimum leaves them out.
        let (request, candidates, map) = setup(vec![
            associate_with_window("A1", 0, 16),
            associate_with_window("A2", 0, 16),
        ]);
        let curve = DemandCurve::constant(request.grid.total_slots(), 1);
        let config = SolverConfig::default().with_mode(OptimizationMode::MatchDemand);
        let result = CpSatSolver::new(config).solve(&request, &candidates, &map, Some(&curve));

        assert_eq!(result.status, SolverStatus::Optimal);
        let schedule = result.schedule.expect("schedule");
        assert_eq!(schedule.assignments.len(), 1);
        assert_eq!(schedule.unscheduled.len(), 1);
        for slot in 0..16 {
            assert_eq!(schedule.coverage_at(slot), 1);
        }
    }

    #[test]
    fn test_maximize_coverage_takes_both() {
        let (request, candidates, map) = setup(vec![
            associate_with_window("A1", 0, 16),
            associate_with_window("A2", 0, 16),
        ]);
        let config = SolverConfig::default().with_mode(OptimizationMode::MaximizeCoverage);
        let result = CpSatSolver::new(config).solve(&request, &candidates, &map, None);

        assert_eq!(result.status, SolverStatus::Optimal);
        assert_eq!(result.schedule.expect("schedule").assignments.len(), 2);
    }

    #[test]
    fn test_zero_time_limit_reports_timeout() {
        let (request, candidates, map) = setup(vec![associate_with_window("A1", 0, 68)]);
        let config = SolverConfig::default().with_time_limit(0.0);
        let result = CpSatSolver::new(config).solve(&request, &candidates, &map, None);

        assert_eq!(result.status, SolverStatus::Timeout);
        assert!(result.schedule.is_none());
        assert!(!result.is_feasible());
    }

    #[test]
    fn test_restricted_associates_respect_caps() {
        // Three associates who can only do GmdSm (cap 2): the optimum can
        // schedule at most two of them at a time over the same window.
        let restricted = |id: &str| {
            associate_with_window(id, 0, 16).with_allowed_roles([JobRole::GmdSm])
        };
        let (mut request, candidates, map) = setup(vec![
            restricted("A1"),
            restricted("A2"),
            restricted("A3"),
        ]);
        request.job_caps.insert(JobRole::GmdSm, 2);

        let config = SolverConfig::default().with_mode(OptimizationMode::MaximizeCoverage);
        let result = CpSatSolver::new(config).solve(&request, &candidates, &map, None);

        assert_eq!(result.status, SolverStatus::Optimal);
        let schedule = result.schedule.expect("schedule");
        assert_eq!(schedule.assignments.len(), 2);
        for slot in 0..16 {
            assert!(schedule.role_coverage_at(slot, JobRole::GmdSm) <= 2);
        }
    }

    #[test]
    fn test_determinism() {
        let (request, candidates, map) = setup(vec![
            associate_with_window("A1", 0, 20),
            associate_with_window("A2", 4, 24),
        ]);
        let config = SolverConfig::default().with_mode(OptimizationMode::Balanced);
        let first = CpSatSolver::new(config.clone()).solve(&request, &candidates, &map, None);
        let second = CpSatSolver::new(config).solve(&request, &candidates, &map, None);
        assert_eq!(first.schedule, second.schedule);
        assert_eq!(first.objective_value, second.objective_value);
    }
}

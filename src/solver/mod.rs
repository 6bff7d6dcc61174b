//! Solvers and shared solver configuration.
//!
//! Two interchangeable engines consume the same precomputed candidates:
//! a greedy coverage-driven heuristic ([`heuristic::HeuristicSolver`]) and
//! an exact 0/1 constraint model with a branch-and-bound engine
//! ([`cp::CpSatSolver`]). The hybrid strategy runs the exact solver under a
//! deadline and falls back to the heuristic when it fails to produce a
//! solution.

pub mod candidates;
pub mod cp;
pub mod heuristic;

pub(crate) mod roles;

use serde::{Deserialize, Serialize};

/// Which engine to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// Fast greedy heuristic.
    Heuristic,
    /// Exact constraint model under a time limit.
    CpSat,
    /// Exact first; heuristic when the exact solve yields nothing.
    #[default]
    Hybrid,
}

/// Objective to optimize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    /// Maximize total on-floor time.
    MaximizeCoverage,
    /// Match the demand curve as closely as possible.
    MatchDemand,
    /// Heavily penalize staffing below demand.
    MinimizeUndercoverage,
    /// Blend coverage, matching, and both penalties.
    #[default]
    Balanced,
}

/// Outcome of a constraint solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Search finished; the incumbent is optimal.
    Optimal,
    /// Deadline hit with an incumbent in hand.
    Feasible,
    /// No selection satisfies the constraints.
    Infeasible,
    /// Deadline hit before any incumbent was found.
    Timeout,
}

impl SolverStatus {
    /// Whether the solve produced a usable schedule.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

/// Objective weights derived from an [`OptimizationMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Reward per on-floor slot.
    pub coverage: i64,
    /// Reward per slot of demand matched (`min(coverage, demand)`).
    pub demand: i64,
    /// Penalty per slot of staffing below demand.
    pub undercoverage: i64,
    /// Penalty per slot of staffing beyond demand.
    pub overcoverage: i64,
    /// Tie-breaking penalty scale for soft role preferences.
    pub soft_preference: i64,
}

/// Configuration for the constraint solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock limit for the exact solve.
    pub time_limit_seconds: f64,
    /// Objective selection.
    pub optimization_mode: OptimizationMode,
    /// Weight for coverage maximization.
    pub coverage_weight: i64,
    /// Weight for demand matching.
    pub demand_weight: i64,
    /// Penalty multiplier for undercoverage.
    pub undercoverage_weight: i64,
    /// Penalty multiplier for overcoverage.
    pub overcoverage_weight: i64,
    /// Tie-breaker weight for soft preferences.
    pub soft_preference_weight: i64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: 30.0,
            optimization_mode: OptimizationMode::default(),
            coverage_weight: 30,
            demand_weight: 40,
            undercoverage_weight: 100,
            overcoverage_weight: 10,
            soft_preference_weight: 1,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_seconds = seconds;
        self
    }

    /// Sets the optimization mode.
    pub fn with_mode(mut self, mode: OptimizationMode) -> Self {
        self.optimization_mode = mode;
        self
    }

    /// Resolves the mode into concrete objective weights.
    pub fn weights(&self) -> ObjectiveWeights {
        match self.optimization_mode {
            OptimizationMode::MaximizeCoverage => ObjectiveWeights {
                coverage: self.coverage_weight.max(1),
                demand: 0,
                undercoverage: 0,
                overcoverage: 0,
                soft_preference: self.soft_preference_weight,
            },
            OptimizationMode::MatchDemand => ObjectiveWeights {
                coverage: 0,
                demand: self.demand_weight.max(1),
                undercoverage: self.undercoverage_weight,
                overcoverage: self.overcoverage_weight,
                soft_preference: self.soft_preference_weight,
            },
            OptimizationMode::MinimizeUndercoverage => ObjectiveWeights {
                coverage: 0,
                demand: self.demand_weight.max(1),
                undercoverage: self.undercoverage_weight.max(1) * 10,
                overcoverage: 0,
                soft_preference: self.soft_preference_weight,
            },
            OptimizationMode::Balanced => ObjectiveWeights {
                coverage: self.coverage_weight,
                demand: self.demand_weight,
                undercoverage: self.undercoverage_weight,
                overcoverage: self.overcoverage_weight,
                soft_preference: self.soft_preference_weight,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_weight_mapping() {
        let config = SolverConfig::default();

        let coverage_only = config
            .clone()
            .with_mode(OptimizationMode::MaximizeCoverage)
            .weights();
        assert!(coverage_only.coverage > 0);
        assert_eq!(coverage_only.demand, 0);
        assert_eq!(coverage_only.undercoverage, 0);

        let match_demand = config
            .clone()
            .with_mode(OptimizationMode::MatchDemand)
            .weights();
        assert_eq!(match_demand.coverage, 0);
        assert!(match_demand.demand > 0);
        assert!(match_demand.undercoverage > 0);

        let minimize_under = config
            .clone()
            .with_mode(OptimizationMode::MinimizeUndercoverage)
            .weights();
        assert!(minimize_under.undercoverage > match_demand.undercoverage);

        let balanced = config.with_mode(OptimizationMode::Balanced).weights();
        assert!(balanced.coverage > 0);
        assert!(balanced.demand > 0);
        assert!(balanced.undercoverage > 0);
        assert!(balanced.overcoverage > 0);
    }

    #[test]
    fn test_status_has_solution() {
        assert!(SolverStatus::Optimal.has_solution());
        assert!(SolverStatus::Feasible.has_solution());
        assert!(!SolverStatus::Infeasible.has_solution());
        assert!(!SolverStatus::Timeout.has_solution());
    }
}

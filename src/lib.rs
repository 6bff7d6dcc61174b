//! Workforce shift scheduling.
//!
//! Produces daily and weekly schedules for up to ~80 associates at
//! 15-minute resolution, maximizing on-floor coverage (optionally against
//! a per-slot demand curve) while honoring labor policies, role
//! capacities, availability, and capability restrictions.
//!
//! # Modules
//!
//! - **`models`**: domain types — grid, associates, requests, schedules
//! - **`policies`**: shift / lunch / break rules (swappable trait objects)
//! - **`demand`**: demand curves, profiles, match metrics
//! - **`solver`**: candidate enumeration, greedy heuristic, exact 0/1
//!   constraint solver
//! - **`scheduler`**: daily, weekly, and demand-aware orchestration
//! - **`validation`**: the validator — the single source of truth for
//!   constraint semantics
//! - **`demo`**: seeded sample-roster synthesis for the CLI demos
//!
//! # Quick start
//!
//! ```
//! use chrono::NaiveDate;
//! use shiftplan::models::{Associate, Availability, ScheduleRequest};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
//! let associates = vec![
//!     Associate::new("A1", "Alice").with_availability(date, Availability::new(0, 68)),
//!     Associate::new("A2", "Bob").with_availability(date, Availability::new(12, 68)),
//! ];
//! let request = ScheduleRequest::new(date, associates);
//!
//! let schedule = shiftplan::generate_schedule(&request).unwrap();
//! let result = shiftplan::validate(&schedule, &request);
//! assert!(result.is_valid);
//! ```
//!
//! # Determinism
//!
//! A solve is a pure function of its inputs: the request `seed` drives
//! every tie-break and shuffle, and identical inputs produce identical
//! schedules. The exact solver limits itself by a deterministic node
//! budget under its wall-clock deadline.

pub mod demand;
pub mod demo;
pub mod error;
pub mod models;
pub mod policies;
pub mod scheduler;
pub mod solver;
pub mod validation;

use std::collections::HashMap;

pub use error::ConfigError;

use demand::WeeklyDemand;
use models::{Associate, DaySchedule, ScheduleRequest, WeeklySchedule, WeeklyScheduleRequest};
use scheduler::{DemandAwareConfig, DemandAwareScheduler, Scheduler, WeeklyResult, WeeklyScheduler};
use validation::{ScheduleValidator, ValidationResult};

/// Generates a single-day schedule with default policies and the
/// heuristic solver.
pub fn generate_schedule(request: &ScheduleRequest) -> Result<DaySchedule, ConfigError> {
    Scheduler::new().generate_schedule(request)
}

/// Generates a weekly schedule with default policies.
pub fn generate_weekly(request: &WeeklyScheduleRequest) -> Result<WeeklySchedule, ConfigError> {
    WeeklyScheduler::new().generate(request)
}

/// Generates a demand-aware weekly schedule.
pub fn generate_demand_aware(
    request: &WeeklyScheduleRequest,
    demand: &WeeklyDemand,
    config: &DemandAwareConfig,
) -> Result<WeeklyResult, ConfigError> {
    DemandAwareScheduler::new(config.clone()).generate(request, demand)
}

/// Validates a daily schedule against its request with default policies.
///
/// For custom policies build a [`ScheduleValidator`] over the same policy
/// objects the solver used.
pub fn validate(schedule: &DaySchedule, request: &ScheduleRequest) -> ValidationResult {
    let lookup: HashMap<String, Associate> = request
        .associates
        .iter()
        .map(|a| (a.id.clone(), a.clone()))
        .collect();
    ScheduleValidator::new().validate(schedule, request, &lookup)
}

/// Validates a weekly schedule against its request with default policies.
pub fn validate_weekly(
    schedule: &WeeklySchedule,
    request: &WeeklyScheduleRequest,
) -> ValidationResult {
    let lookup: HashMap<String, Associate> = request
        .associates
        .iter()
        .map(|a| (a.id.clone(), a.clone()))
        .collect();
    ScheduleValidator::new().validate_weekly(schedule, request, &lookup)
}

//! Scheduling orchestration.
//!
//! [`Scheduler`] produces single-day schedules; [`WeeklyScheduler`] layers
//! days-off patterns, weekly hour caps, and fairness on top;
//! [`DemandAwareScheduler`] adds demand curves and solver dispatch with
//! hybrid fallback.

mod daily;
mod demand_aware;
mod weekly;

pub use daily::{ScheduleStats, Scheduler};
pub use demand_aware::{DemandAwareConfig, DemandAwareScheduler, WeeklyResult};
pub use weekly::{DaysOffPlanner, WeeklyScheduler};

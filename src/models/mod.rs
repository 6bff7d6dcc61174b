//! Scheduling domain models.
//!
//! Core data types for workforce scheduling problems and solutions:
//! the discrete time grid, associates with availability and capability
//! limits, requests, and the daily/weekly schedule outputs.
//!
//! All times are slot indices on a [`TimeGrid`]; see that module for the
//! slot arithmetic conventions.

mod associate;
mod request;
mod schedule;
mod time;
mod weekly;

pub use associate::{Associate, Availability, JobRole, Preference};
pub use request::{
    default_job_caps, DaysOffPattern, FairnessConfig, ScheduleRequest, WeeklyScheduleRequest,
    UNCAPPED,
};
pub use schedule::{DaySchedule, RoleBlock, ShiftAssignment};
pub use time::{SlotBlock, TimeGrid};
pub use weekly::{FairnessMetrics, WeeklySchedule};

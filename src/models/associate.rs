//! Associates, roles, and availability.
//!
//! An associate's hard capability surface is the set difference
//! `supervisor_allowed_roles − cannot_do_roles`; role preferences are soft
//! and never change feasibility.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Job roles an associate can hold while on floor.
///
/// Closed set. `Picking` acts as the unlimited overflow role: anyone who
/// may pick can always be placed somewhere.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JobRole {
    Picking,
    GmdSm,
    ExceptionSm,
    Staging,
    Backroom,
    Sr,
}

impl JobRole {
    /// All roles, in fixed order. Index order doubles as the dense index
    /// for per-role count vectors.
    pub const ALL: [JobRole; 6] = [
        JobRole::Picking,
        JobRole::GmdSm,
        JobRole::ExceptionSm,
        JobRole::Staging,
        JobRole::Backroom,
        JobRole::Sr,
    ];

    /// Dense index of the role within [`JobRole::ALL`].
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            JobRole::Picking => 0,
            JobRole::GmdSm => 1,
            JobRole::ExceptionSm => 2,
            JobRole::Staging => 3,
            JobRole::Backroom => 4,
            JobRole::Sr => 5,
        }
    }

    /// Short display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRole::Picking => "picking",
            JobRole::GmdSm => "gmd_sm",
            JobRole::ExceptionSm => "exception_sm",
            JobRole::Staging => "staging",
            JobRole::Backroom => "backroom",
            JobRole::Sr => "sr",
        }
    }
}

impl std::fmt::Display for JobRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soft preference level for a role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Avoid,
    #[default]
    Neutral,
    Prefer,
}

/// Availability window for one day, in slots.
///
/// Half-open; `start_slot == end_slot` means the day is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// First slot the associate may work (inclusive).
    pub start_slot: usize,
    /// Last slot the associate may work (exclusive).
    pub end_slot: usize,
}

impl Availability {
    /// Creates an availability window.
    pub fn new(start_slot: usize, end_slot: usize) -> Self {
        Self {
            start_slot,
            end_slot,
        }
    }

    /// Availability representing a full day off.
    pub fn off_day() -> Self {
        Self {
            start_slot: 0,
            end_slot: 0,
        }
    }

    /// Whether the day is off.
    #[inline]
    pub fn is_off(&self) -> bool {
        self.end_slot <= self.start_slot
    }

    /// Number of available slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.end_slot.saturating_sub(self.start_slot)
    }
}

/// An associate who can be scheduled.
///
/// Immutable during a solve; schedules refer back by `id` only and the
/// caller supplies an id→associate lookup where needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Associate {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Per-date availability. Dates without an entry are off days.
    pub availability: HashMap<NaiveDate, Availability>,
    /// Maximum work minutes per day.
    pub max_minutes_per_day: u32,
    /// Maximum work minutes per week.
    pub max_minutes_per_week: u32,
    /// Roles the supervisor has approved (hard).
    pub supervisor_allowed_roles: BTreeSet<JobRole>,
    /// Roles the associate cannot perform (hard).
    pub cannot_do_roles: BTreeSet<JobRole>,
    /// Soft preferences per role.
    pub role_preferences: BTreeMap<JobRole, Preference>,
}

impl Associate {
    /// Creates an associate with default limits (8 h/day, 40 h/week) and
    /// all roles allowed.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            availability: HashMap::new(),
            max_minutes_per_day: 480,
            max_minutes_per_week: 2400,
            supervisor_allowed_roles: JobRole::ALL.into_iter().collect(),
            cannot_do_roles: BTreeSet::new(),
            role_preferences: BTreeMap::new(),
        }
    }

    /// Sets availability for a date.
    pub fn with_availability(mut self, date: NaiveDate, availability: Availability) -> Self {
        self.availability.insert(date, availability);
        self
    }

    /// Sets the daily work-minute limit.
    pub fn with_max_minutes_per_day(mut self, minutes: u32) -> Self {
        self.max_minutes_per_day = minutes;
        self
    }

    /// Sets the weekly work-minute limit.
    pub fn with_max_minutes_per_week(mut self, minutes: u32) -> Self {
        self.max_minutes_per_week = minutes;
        self
    }

    /// Restricts the supervisor-approved role set.
    pub fn with_allowed_roles(mut self, roles: impl IntoIterator<Item = JobRole>) -> Self {
        self.supervisor_allowed_roles = roles.into_iter().collect();
        self
    }

    /// Marks roles the associate cannot perform.
    pub fn with_cannot_do(mut self, roles: impl IntoIterator<Item = JobRole>) -> Self {
        self.cannot_do_roles.extend(roles);
        self
    }

    /// Sets a soft preference for a role.
    pub fn with_preference(mut self, role: JobRole, preference: Preference) -> Self {
        self.role_preferences.insert(role, preference);
        self
    }

    /// Availability for a date; missing dates are off days.
    pub fn availability_on(&self, date: NaiveDate) -> Availability {
        self.availability
            .get(&date)
            .copied()
            .unwrap_or_else(Availability::off_day)
    }

    /// Whether the associate may hold `role` (hard constraints only).
    pub fn can_do_role(&self, role: JobRole) -> bool {
        self.supervisor_allowed_roles.contains(&role) && !self.cannot_do_roles.contains(&role)
    }

    /// Soft preference for a role (`Neutral` if unset).
    pub fn preference_for(&self, role: JobRole) -> Preference {
        self.role_preferences
            .get(&role)
            .copied()
            .unwrap_or_default()
    }

    /// Effective eligible role set: `supervisor_allowed − cannot_do`.
    pub fn eligible_roles(&self) -> BTreeSet<JobRole> {
        self.supervisor_allowed_roles
            .difference(&self.cannot_do_roles)
            .copied()
            .collect()
    }
}

//! Schedule validation — the single source of truth for constraint
//! semantics.
//!
//! Every generated schedule should pass through here before being
//! consumed. The validator never short-circuits: it reports every
//! violation it finds, categorized by [`ViolationKind`]. It reads the same
//! policy objects the candidate generator and solvers use, so placement
//! rules (lunch windows, break bands) cannot drift between producer and
//! checker.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::{
    Associate, DaySchedule, JobRole, ScheduleRequest, ShiftAssignment, WeeklySchedule,
    WeeklyScheduleRequest,
};
use crate::policies::{
    BreakPolicy, DefaultBreakPolicy, DefaultLunchPolicy, DefaultShiftPolicy, LunchPolicy,
    ShiftPolicy,
};

/// Categories of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A shift, lunch, or break lies outside the operating window.
    Window,
    /// A shift lies outside the associate's availability.
    Availability,
    /// Work duration violates the shift policy.
    ShiftBounds,
    /// Lunch count, duration, containment, or placement is wrong.
    Lunch,
    /// Break count, duration, containment, spacing, or placement is wrong.
    Break,
    /// A role outside the associate's eligible set, or an on-floor slot
    /// with no role at all.
    RoleEligibility,
    /// A per-role per-slot cap is exceeded.
    RoleCap,
    /// Daily work-minute limit exceeded.
    DailyHours,
    /// Weekly work-minute limit exceeded.
    WeeklyHours,
    /// Required days off or the days-off pattern is violated.
    DaysOff,
}

/// A single violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Category.
    pub kind: ViolationKind,
    /// Offending associate, when the violation is per-associate.
    pub associate_id: Option<String>,
    /// Offending slot, when the violation is per-slot.
    pub slot: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            associate_id: None,
            slot: None,
            message: message.into(),
        }
    }

    fn for_associate(mut self, id: &str) -> Self {
        self.associate_id = Some(id.to_string());
        self
    }

    fn at_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}]", self.kind)?;
        if let Some(id) = &self.associate_id {
            write!(f, " associate {id}:")?;
        }
        write!(f, " {}", self.message)?;
        if let Some(slot) = self.slot {
            write!(f, " (slot {slot})")?;
        }
        Ok(())
    }
}

/// Result of validating a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no violations were found.
    pub is_valid: bool,
    /// Every violation found, in check order.
    pub violations: Vec<Violation>,
    /// Advisory findings that do not affect validity.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A clean result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn push(&mut self, violation: Violation) {
        self.is_valid = false;
        self.violations.push(violation);
    }

    fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Violations of a given kind.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

/// Validates schedules against every hard rule.
#[derive(Debug, Clone)]
pub struct ScheduleValidator {
    shift_policy: Arc<dyn ShiftPolicy>,
    lunch_policy: Arc<dyn LunchPolicy>,
    break_policy: Arc<dyn BreakPolicy>,
}

impl Default for ScheduleValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleValidator {
    /// Creates a validator with default policies.
    pub fn new() -> Self {
        Self {
            shift_policy: Arc::new(DefaultShiftPolicy::default()),
            lunch_policy: Arc::new(DefaultLunchPolicy::default()),
            break_policy: Arc::new(DefaultBreakPolicy::default()),
        }
    }

    /// Creates a validator over explicit policies. Pass the same objects
    /// the solver used.
    pub fn with_policies(
        shift_policy: Arc<dyn ShiftPolicy>,
        lunch_policy: Arc<dyn LunchPolicy>,
        break_policy: Arc<dyn BreakPolicy>,
    ) -> Self {
        Self {
            shift_policy,
            lunch_policy,
            break_policy,
        }
    }

    /// Validates a daily schedule against its request.
    pub fn validate(
        &self,
        schedule: &DaySchedule,
        request: &ScheduleRequest,
        associates_by_id: &HashMap<String, Associate>,
    ) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for (id, assignment) in &schedule.assignments {
            match associates_by_id.get(id) {
                Some(associate) => {
                    self.check_assignment(assignment, associate, request, &mut result)
                }
                None => result.push(
                    Violation::new(ViolationKind::Availability, "unknown associate id")
                        .for_associate(id),
                ),
            }
        }

        self.check_role_caps(schedule, request, &mut result);
        result
    }

    fn check_assignment(
        &self,
        assignment: &ShiftAssignment,
        associate: &Associate,
        request: &ScheduleRequest,
        result: &mut ValidationResult,
    ) {
        let id = &assignment.associate_id;
        let grid = &request.grid;
        let total_slots = grid.total_slots();
        let shift = assignment.shift;

        // Window
        if shift.is_empty() {
            result.push(
                Violation::new(ViolationKind::Window, "shift covers no slots").for_associate(id),
            );
        }
        if shift.end_slot > total_slots {
            result.push(
                Violation::new(ViolationKind::Window, "shift ends after the operating window")
                    .for_associate(id)
                    .at_slot(shift.end_slot),
            );
        }
        for block in assignment.lunch.iter().chain(assignment.breaks.iter()) {
            if block.end_slot > total_slots {
                result.push(
                    Violation::new(
                        ViolationKind::Window,
                        "lunch or break ends after the operating window",
                    )
                    .for_associate(id)
                    .at_slot(block.end_slot),
                );
            }
        }

        // Availability
        let availability = associate.availability_on(request.date);
        if availability.is_off() {
            result.push(
                Violation::new(ViolationKind::Availability, "associate is off this day")
                    .for_associate(id),
            );
        } else {
            if shift.start_slot < availability.start_slot {
                result.push(
                    Violation::new(
                        ViolationKind::Availability,
                        format!(
                            "shift starts before availability (slot {} < {})",
                            shift.start_slot, availability.start_slot
                        ),
                    )
                    .for_associate(id),
                );
            }
            if shift.end_slot > availability.end_slot {
                result.push(
                    Violation::new(
                        ViolationKind::Availability,
                        format!(
                            "shift ends after availability (slot {} > {})",
                            shift.end_slot, availability.end_slot
                        ),
                    )
                    .for_associate(id),
                );
            }
        }

        // Shift bounds
        let work_minutes = assignment.work_minutes(grid);
        if work_minutes < self.shift_policy.min_work_minutes() {
            result.push(
                Violation::new(
                    ViolationKind::ShiftBounds,
                    format!(
                        "work time {work_minutes} min is below minimum {} min",
                        self.shift_policy.min_work_minutes()
                    ),
                )
                .for_associate(id),
            );
        }
        if work_minutes > self.shift_policy.max_work_minutes() {
            result.push(
                Violation::new(
                    ViolationKind::ShiftBounds,
                    format!(
                        "work time {work_minutes} min exceeds maximum {} min",
                        self.shift_policy.max_work_minutes()
                    ),
                )
                .for_associate(id),
            );
        }

        self.check_lunch(assignment, work_minutes, request, result);
        self.check_breaks(assignment, work_minutes, grid, result);
        self.check_roles(assignment, associate, result);

        // Daily hours
        if work_minutes > associate.max_minutes_per_day {
            result.push(
                Violation::new(
                    ViolationKind::DailyHours,
                    format!(
                        "work time {work_minutes} min exceeds daily max {} min",
                        associate.max_minutes_per_day
                    ),
                )
                .for_associate(id),
            );
        }
    }

    fn check_lunch(
        &self,
        assignment: &ShiftAssignment,
        work_minutes: u32,
        request: &ScheduleRequest,
        result: &mut ValidationResult,
    ) {
        let id = &assignment.associate_id;
        let grid = &request.grid;
        let expected = self.lunch_policy.lunch_minutes(work_minutes);
        let actual = assignment.lunch_minutes(grid);

        if actual != expected {
            result.push(
                Violation::new(
                    ViolationKind::Lunch,
                    format!(
                        "lunch {actual} min does not match required {expected} min \
                         for {work_minutes} min of work"
                    ),
                )
                .for_associate(id),
            );
        }

        let Some(lunch) = assignment.lunch else {
            return;
        };

        if !lunch.strictly_inside(&assignment.shift) {
            result.push(
                Violation::new(ViolationKind::Lunch, "lunch is not strictly inside the shift")
                    .for_associate(id)
                    .at_slot(lunch.start_slot),
            );
        }

        match self
            .lunch_policy
            .lunch_window(assignment.shift, lunch.len(), request.is_busy_day)
        {
            Some((earliest, latest)) => {
                if lunch.start_slot < earliest || lunch.start_slot > latest {
                    result.push(
                        Violation::new(
                            ViolationKind::Lunch,
                            format!(
                                "lunch start {} outside placement window [{earliest}, {latest}]",
                                lunch.start_slot
                            ),
                        )
                        .for_associate(id)
                        .at_slot(lunch.start_slot),
                    );
                }
            }
            None => result.push(
                Violation::new(ViolationKind::Lunch, "no valid lunch placement exists")
                    .for_associate(id),
            ),
        }
    }

    fn check_breaks(
        &self,
        assignment: &ShiftAssignment,
        work_minutes: u32,
        grid: &crate::models::TimeGrid,
        result: &mut ValidationResult,
    ) {
        let id = &assignment.associate_id;
        let expected_count = self.break_policy.break_count(work_minutes);
        let actual_count = assignment.breaks.len();

        if actual_count != expected_count {
            result.push(
                Violation::new(
                    ViolationKind::Break,
                    format!(
                        "break count {actual_count} does not match required {expected_count} \
                         for {work_minutes} min of work"
                    ),
                )
                .for_associate(id),
            );
        }

        let expected_duration = self.break_policy.break_minutes();
        let gap = self.break_policy.min_gap_from_lunch_slots();

        for (i, block) in assignment.breaks.iter().enumerate() {
            if block.duration_minutes(grid) != expected_duration {
                result.push(
                    Violation::new(
                        ViolationKind::Break,
                        format!(
                            "break {} is {} min, required {expected_duration} min",
                            i + 1,
                            block.duration_minutes(grid)
                        ),
                    )
                    .for_associate(id)
                    .at_slot(block.start_slot),
                );
            }
            if !block.strictly_inside(&assignment.shift) {
                result.push(
                    Violation::new(
                        ViolationKind::Break,
                        format!("break {} is not strictly inside the shift", i + 1),
                    )
                    .for_associate(id)
                    .at_slot(block.start_slot),
                );
            }
            if let Some(lunch) = assignment.lunch {
                if block.overlaps(&lunch) {
                    result.push(
                        Violation::new(
                            ViolationKind::Break,
                            format!("break {} overlaps the lunch", i + 1),
                        )
                        .for_associate(id)
                        .at_slot(block.start_slot),
                    );
                } else if block.end_slot + gap > lunch.start_slot
                    && lunch.end_slot + gap > block.start_slot
                {
                    result.push(
                        Violation::new(
                            ViolationKind::Break,
                            format!("break {} is adjacent to the lunch", i + 1),
                        )
                        .for_associate(id)
                        .at_slot(block.start_slot),
                    );
                }
            }
            for (j, other) in assignment.breaks.iter().enumerate().skip(i + 1) {
                if block.overlaps(other) {
                    result.push(
                        Violation::new(
                            ViolationKind::Break,
                            format!("break {} overlaps break {}", i + 1, j + 1),
                        )
                        .for_associate(id)
                        .at_slot(block.start_slot),
                    );
                }
            }
        }

        // Placement bands only make sense when the count is right.
        if actual_count == expected_count && expected_count > 0 {
            let anchors = self.break_policy.anchors(assignment.shift, expected_count);
            let variance = self.break_policy.max_variance_slots();
            let mut sorted: Vec<_> = assignment.breaks.clone();
            sorted.sort_by_key(|b| b.start_slot);
            for (block, &anchor) in sorted.iter().zip(anchors.iter()) {
                let drift = block.start_slot.abs_diff(anchor);
                if drift > variance {
                    result.push(
                        Violation::new(
                            ViolationKind::Break,
                            format!(
                                "break start {} drifts {drift} slots from anchor {anchor} \
                                 (max {variance})",
                                block.start_slot
                            ),
                        )
                        .for_associate(id)
                        .at_slot(block.start_slot),
                    );
                }
            }
        }
    }

    fn check_roles(
        &self,
        assignment: &ShiftAssignment,
        associate: &Associate,
        result: &mut ValidationResult,
    ) {
        let id = &assignment.associate_id;
        let eligible = associate.eligible_roles();

        for role_block in &assignment.roles {
            if !eligible.contains(&role_block.role) {
                result.push(
                    Violation::new(
                        ViolationKind::RoleEligibility,
                        format!("role {} is not in the eligible set", role_block.role),
                    )
                    .for_associate(id)
                    .at_slot(role_block.block.start_slot),
                );
            }
        }

        for slot in assignment.shift.slots() {
            if assignment.is_on_floor(slot) && assignment.role_at(slot).is_none() {
                result.push(
                    Violation::new(ViolationKind::RoleEligibility, "on-floor slot has no role")
                        .for_associate(id)
                        .at_slot(slot),
                );
            }
        }
    }

    fn check_role_caps(
        &self,
        schedule: &DaySchedule,
        request: &ScheduleRequest,
        result: &mut ValidationResult,
    ) {
        for slot in 0..schedule.grid.total_slots() {
            for role in JobRole::ALL {
                let count = schedule.role_coverage_at(slot, role);
                let cap = request.job_cap(role);
                if count > cap {
                    result.push(
                        Violation::new(
                            ViolationKind::RoleCap,
                            format!("role {role} has {count} assigned but cap is {cap}"),
                        )
                        .at_slot(slot),
                    );
                }
            }
        }
    }

    /// Validates a weekly schedule: every day, plus weekly hour caps,
    /// required days off, and the days-off pattern.
    pub fn validate_weekly(
        &self,
        weekly: &WeeklySchedule,
        request: &WeeklyScheduleRequest,
        associates_by_id: &HashMap<String, Associate>,
    ) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for (&date, day) in &weekly.days {
            let day_request = request.day_request(date, request.associates.clone());
            let day_result = self.validate(day, &day_request, associates_by_id);
            for mut violation in day_result.violations {
                violation.message = format!("{date}: {}", violation.message);
                result.push(violation);
            }
            for warning in day_result.warnings {
                result.warn(format!("{date}: {warning}"));
            }
        }

        let dates = request.dates();
        for associate in &request.associates {
            self.check_weekly_hours(weekly, associate, &mut result);
            self.check_days_off(weekly, request, associate, &dates, &mut result);
        }

        self.check_fairness_warnings(weekly, request, &mut result);
        result
    }

    fn check_weekly_hours(
        &self,
        weekly: &WeeklySchedule,
        associate: &Associate,
        result: &mut ValidationResult,
    ) {
        let total = weekly.weekly_minutes(&associate.id);
        if total > associate.max_minutes_per_week {
            result.push(
                Violation::new(
                    ViolationKind::WeeklyHours,
                    format!(
                        "weekly work time {total} min exceeds max {} min",
                        associate.max_minutes_per_week
                    ),
                )
                .for_associate(&associate.id),
            );
        }
    }

    fn check_days_off(
        &self,
        weekly: &WeeklySchedule,
        request: &WeeklyScheduleRequest,
        associate: &Associate,
        dates: &[NaiveDate],
        result: &mut ValidationResult,
    ) {
        use crate::models::DaysOffPattern;

        let worked: Vec<NaiveDate> = dates
            .iter()
            .copied()
            .filter(|d| {
                weekly
                    .days
                    .get(d)
                    .is_some_and(|day| day.assignments.contains_key(&associate.id))
            })
            .collect();
        let off: Vec<NaiveDate> = dates
            .iter()
            .copied()
            .filter(|d| !worked.contains(d))
            .collect();

        if (off.len() as u32) < request.required_days_off {
            result.push(
                Violation::new(
                    ViolationKind::DaysOff,
                    format!(
                        "has {} days off, requires {}",
                        off.len(),
                        request.required_days_off
                    ),
                )
                .for_associate(&associate.id),
            );
        }

        match request.days_off_pattern {
            DaysOffPattern::None => {}
            DaysOffPattern::TwoConsecutive => {
                if !has_consecutive_pair(&off) {
                    result.push(
                        Violation::new(
                            ViolationKind::DaysOff,
                            "does not have two consecutive days off",
                        )
                        .for_associate(&associate.id),
                    );
                }
            }
            DaysOffPattern::OneWeekendDay => {
                let range_has_weekend = dates.iter().any(|d| is_weekend(*d));
                let has_weekend_off = off.iter().any(|d| is_weekend(*d));
                if range_has_weekend && !has_weekend_off {
                    result.push(
                        Violation::new(ViolationKind::DaysOff, "does not have a weekend day off")
                            .for_associate(&associate.id),
                    );
                }
            }
            DaysOffPattern::EveryOtherDay => {
                if has_consecutive_pair(&worked) {
                    result.push(
                        Violation::new(ViolationKind::DaysOff, "works two consecutive days")
                            .for_associate(&associate.id),
                    );
                }
            }
        }
    }

    fn check_fairness_warnings(
        &self,
        weekly: &WeeklySchedule,
        request: &WeeklyScheduleRequest,
        result: &mut ValidationResult,
    ) {
        let min_minutes = request.fairness.min_weekly_minutes;
        if min_minutes > 0 {
            for associate in &request.associates {
                let available = request
                    .dates()
                    .iter()
                    .any(|&d| !associate.availability_on(d).is_off());
                let total = weekly.weekly_minutes(&associate.id);
                if available && total < min_minutes {
                    result.warn(format!(
                        "associate {} has only {total} min scheduled (minimum target \
                         {min_minutes} min)",
                        associate.id
                    ));
                }
            }
        }

        if let Some(metrics) = &weekly.fairness {
            let spread_hours = metrics.max_hours - metrics.min_hours;
            let allowed_hours = request.fairness.max_hours_variance / 60.0;
            if spread_hours > allowed_hours {
                result.warn(format!(
                    "hours spread {spread_hours:.1} h exceeds threshold {allowed_hours:.1} h"
                ));
            }
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn has_consecutive_pair(dates: &[NaiveDate]) -> bool {
    let mut sorted = dates.to_vec();
    sorted.sort();
    sorted.windows(2).any(|pair| {
        pair[0]
            .checked_add_days(Days::new(1))
            .is_some_and(|next| next == pair[1])
    })
}

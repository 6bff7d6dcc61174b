//! Schedule (solution) model for a single day.
//!
//! A `DaySchedule` is a complete set of shift assignments plus a record of
//! associates who could not be scheduled. It is produced by a solver and
//! then only read: the validator, metrics, and renderers all consume it.
//!
//! Invariant: on-floor coverage at slot `t` equals the number of associates
//! whose assignment covers `t` outside their lunch and breaks.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::associate::JobRole;
use crate::models::time::{SlotBlock, TimeGrid};

/// A role held over a contiguous run of work slots.
///
/// Role blocks span whole work periods, so a role can only change across a
/// lunch or break boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBlock {
    /// The role held.
    pub role: JobRole,
    /// The slots over which it is held.
    pub block: SlotBlock,
}

/// Complete shift assignment for one associate on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    /// Associate this shift belongs to.
    pub associate_id: String,
    /// The whole shift, lunch included.
    pub shift: SlotBlock,
    /// Lunch block, if the shift is long enough to require one.
    pub lunch: Option<SlotBlock>,
    /// Rest breaks, in start order.
    pub breaks: Vec<SlotBlock>,
    /// Role blocks covering the work periods.
    pub roles: Vec<RoleBlock>,
}

impl ShiftAssignment {
    /// Creates a bare assignment with no lunch, breaks, or roles yet.
    pub fn new(associate_id: impl Into<String>, shift: SlotBlock) -> Self {
        Self {
            associate_id: associate_id.into(),
            shift,
            lunch: None,
            breaks: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// Lunch slots (0 when no lunch).
    #[inline]
    pub fn lunch_slots(&self) -> usize {
        self.lunch.map(|l| l.len()).unwrap_or(0)
    }

    /// Total break slots.
    #[inline]
    pub fn break_slots(&self) -> usize {
        self.breaks.iter().map(|b| b.len()).sum()
    }

    /// Work slots: shift minus lunch. Breaks count as work time.
    #[inline]
    pub fn work_slots(&self) -> usize {
        self.shift.len().saturating_sub(self.lunch_slots())
    }

    /// Work minutes on the given grid.
    #[inline]
    pub fn work_minutes(&self, grid: &TimeGrid) -> u32 {
        grid.slots_to_minutes(self.work_slots())
    }

    /// Lunch minutes on the given grid.
    #[inline]
    pub fn lunch_minutes(&self, grid: &TimeGrid) -> u32 {
        grid.slots_to_minutes(self.lunch_slots())
    }

    /// Total break minutes on the given grid.
    #[inline]
    pub fn break_minutes(&self, grid: &TimeGrid) -> u32 {
        grid.slots_to_minutes(self.break_slots())
    }

    /// On-floor minutes: work minus breaks.
    #[inline]
    pub fn on_floor_minutes(&self, grid: &TimeGrid) -> u32 {
        grid.slots_to_minutes(self.work_slots().saturating_sub(self.break_slots()))
    }

    /// Whether the associate is on floor at `slot`.
    pub fn is_on_floor(&self, slot: usize) -> bool {
        if !self.shift.contains(slot) {
            return false;
        }
        if self.lunch.is_some_and(|l| l.contains(slot)) {
            return false;
        }
        !self.breaks.iter().any(|b| b.contains(slot))
    }

    /// Role held at `slot`, if on floor and assigned.
    pub fn role_at(&self, slot: usize) -> Option<JobRole> {
        self.roles
            .iter()
            .find(|r| r.block.contains(slot))
            .map(|r| r.role)
    }

    /// Contiguous work periods between lunch and breaks, in time order.
    pub fn work_periods(&self) -> Vec<SlotBlock> {
        let mut off: Vec<SlotBlock> = self.breaks.clone();
        if let Some(lunch) = self.lunch {
            off.push(lunch);
        }
        off.sort_by_key(|b| b.start_slot);

        let mut periods = Vec::new();
        let mut cursor = self.shift.start_slot;
        for block in off {
            if cursor < block.start_slot {
                periods.push(SlotBlock::new(cursor, block.start_slot));
            }
            cursor = cursor.max(block.end_slot);
        }
        if cursor < self.shift.end_slot {
            periods.push(SlotBlock::new(cursor, self.shift.end_slot));
        }
        periods
    }
}

/// Complete schedule output for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Date of the schedule.
    pub date: NaiveDate,
    /// Operating window the slot indices refer to.
    pub grid: TimeGrid,
    /// Assignments by associate id. Present only for associates who work.
    pub assignments: BTreeMap<String, ShiftAssignment>,
    /// Associates who were available but got no shift (infeasibility or
    /// no positive contribution). Sorted by id.
    pub unscheduled: Vec<String>,
}

impl DaySchedule {
    /// Creates an empty schedule for a date.
    pub fn new(date: NaiveDate, grid: TimeGrid) -> Self {
        Self {
            date,
            grid,
            assignments: BTreeMap::new(),
            unscheduled: Vec::new(),
        }
    }

    /// Inserts an assignment.
    pub fn insert(&mut self, assignment: ShiftAssignment) {
        self.assignments
            .insert(assignment.associate_id.clone(), assignment);
    }

    /// Number of associates on floor at `slot`.
    pub fn coverage_at(&self, slot: usize) -> u32 {
        self.assignments
            .values()
            .filter(|a| a.is_on_floor(slot))
            .count() as u32
    }

    /// Number of associates holding `role` at `slot`.
    pub fn role_coverage_at(&self, slot: usize, role: JobRole) -> u32 {
        self.assignments
            .values()
            .filter(|a| a.is_on_floor(slot) && a.role_at(slot) == Some(role))
            .count() as u32
    }

    /// Coverage for every slot of the day.
    pub fn coverage_timeline(&self) -> Vec<u32> {
        (0..self.grid.total_slots())
            .map(|slot| self.coverage_at(slot))
            .collect()
    }

    /// Ids of associates on lunch at `slot`, sorted.
    pub fn on_lunch_at(&self, slot: usize) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|(_, a)| a.lunch.is_some_and(|l| l.contains(slot)))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids of associates on a break at `slot`, sorted.
    pub fn on_break_at(&self, slot: usize) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|(_, a)| a.breaks.iter().any(|b| b.contains(slot)))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Total work minutes across all assignments.
    pub fn total_work_minutes(&self) -> u32 {
        self.assignments
            .values()
            .map(|a| a.work_minutes(&self.grid))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_assignment() -> ShiftAssignment {
        // 6-hour shift 08:00-14:30: 26 slots, 2-slot lunch, 1 break.
        let mut a = ShiftAssignment::new("A1", SlotBlock::new(12, 38));
        a.lunch = Some(SlotBlock::new(24, 26));
        a.breaks = vec![SlotBlock::new(18, 19)];
        a.roles = vec![
            RoleBlock {
                role: JobRole::Picking,
                block: SlotBlock::new(12, 18),
            },
            RoleBlock {
                role: JobRole::Picking,
                block: SlotBlock::new(19, 24),
            },
            RoleBlock {
                role: JobRole::Staging,
                block: SlotBlock::new(26, 38),
            },
        ];
        a
    }

    #[test]
    fn test_work_minutes_excludes_lunch_only() {
        let grid = TimeGrid::default();
        let a = sample_assignment();
        assert_eq!(a.work_slots(), 24);
        assert_eq!(a.work_minutes(&grid), 360);
        assert_eq!(a.lunch_minutes(&grid), 30);
        assert_eq!(a.break_minutes(&grid), 15);
        assert_eq!(a.on_floor_minutes(&grid), 345);
    }

    #[test]
    fn test_on_floor_excludes_lunch_and_breaks() {
        let a = sample_assignment();
        assert!(a.is_on_floor(12));
        assert!(!a.is_on_floor(18)); // Break
        assert!(!a.is_on_floor(24)); // Lunch
        assert!(!a.is_on_floor(25));
        assert!(a.is_on_floor(26));
        assert!(!a.is_on_floor(38)); // Past shift end
        assert!(!a.is_on_floor(11));
    }

    #[test]
    fn test_role_at_slot() {
        let a = sample_assignment();
        assert_eq!(a.role_at(12), Some(JobRole::Picking));
        assert_eq!(a.role_at(30), Some(JobRole::Staging));
        assert_eq!(a.role_at(24), None); // Lunch slot has no role block
    }

    #[test]
    fn test_work_periods_split_by_lunch_and_breaks() {
        let a = sample_assignment();
        let periods = a.work_periods();
        assert_eq!(
            periods,
            vec![
                SlotBlock::new(12, 18),
                SlotBlock::new(19, 24),
                SlotBlock::new(26, 38),
            ]
        );
        let covered: usize = periods.iter().map(|p| p.len()).sum();
        assert_eq!(covered, a.work_slots() - a.break_slots());
    }

    #[test]
    fn test_coverage_invariant() {
        let mut schedule = DaySchedule::new(d("2026-08-03"), TimeGrid::default());
        schedule.insert(sample_assignment());
        let mut other = sample_assignment();
        other.associate_id = "A2".into();
        other.lunch = Some(SlotBlock::new(26, 28));
        schedule.insert(other);

        // Slot 24: A1 on lunch, A2 on floor.
        assert_eq!(schedule.coverage_at(24), 1);
        // Slot 12: both on floor.
        assert_eq!(schedule.coverage_at(12), 2);
        assert_eq!(schedule.on_lunch_at(24), vec!["A1"]);
        assert_eq!(schedule.on_break_at(18), vec!["A1", "A2"]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut schedule = DaySchedule::new(d("2026-08-03"), TimeGrid::default());
        schedule.insert(sample_assignment());
        schedule.unscheduled.push("A9".into());

        let json = serde_json::to_string(&schedule).unwrap();
        let decoded: DaySchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule, decoded);
    }
}

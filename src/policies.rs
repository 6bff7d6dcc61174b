//! Labor policies for shifts, lunches, and rest breaks.
//!
//! Policies are kept separate from the solvers so the rules can be swapped
//! and tested independently. The candidate generator, both solvers, and the
//! validator all read the same policy objects, which is what keeps the
//! validator the single source of truth for constraint semantics.
//!
//! All policy outputs are minutes; callers round up to whole slots via
//! [`crate::models::TimeGrid::minutes_to_slots_ceil`]. A shift's total span
//! is work plus lunch; policies are evaluated on work minutes (time on
//! floor plus break time), so lunch length follows directly from work
//! length and no fixpoint iteration is needed.

use std::fmt::Debug;

use crate::error::ConfigError;
use crate::models::SlotBlock;

/// Bounds on valid work durations.
pub trait ShiftPolicy: Send + Sync + Debug {
    /// Minimum work minutes (lunch excluded).
    fn min_work_minutes(&self) -> u32;

    /// Maximum work minutes (lunch excluded).
    fn max_work_minutes(&self) -> u32;

    /// Whether a work duration is acceptable.
    fn is_valid_work(&self, work_minutes: u32) -> bool {
        (self.min_work_minutes()..=self.max_work_minutes()).contains(&work_minutes)
    }

    /// Checks internal consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_work_minutes() < self.min_work_minutes() {
            return Err(ConfigError::InconsistentShiftPolicy {
                min: self.min_work_minutes(),
                max: self.max_work_minutes(),
            });
        }
        Ok(())
    }
}

/// Lunch duration and placement rules.
pub trait LunchPolicy: Send + Sync + Debug {
    /// Required lunch minutes for a work duration (0 = no lunch).
    fn lunch_minutes(&self, work_minutes: u32) -> u32;

    /// Allowed lunch-start range `(earliest, latest)`, both inclusive, for
    /// a lunch of `lunch_slots` slots within `shift`.
    ///
    /// `None` when no start keeps the lunch strictly inside the shift.
    fn lunch_window(
        &self,
        shift: SlotBlock,
        lunch_slots: usize,
        is_busy_day: bool,
    ) -> Option<(usize, usize)>;

    /// Checks internal consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Rest break count and placement rules.
pub trait BreakPolicy: Send + Sync + Debug {
    /// Number of breaks required for a work duration.
    fn break_count(&self, work_minutes: u32) -> usize;

    /// Length of each break in minutes.
    fn break_minutes(&self) -> u32;

    /// Ideal break start positions within `shift`: the midpoint for one
    /// break, the 1/3 and 2/3 points for two.
    fn anchors(&self, shift: SlotBlock, count: usize) -> Vec<usize>;

    /// How far (in slots) a break may drift from its anchor.
    fn max_variance_slots(&self) -> usize;

    /// Minimum empty slots between a break and the lunch.
    fn min_gap_from_lunch_slots(&self) -> usize;

    /// Checks internal consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Default shift policy: 4–8 hours of work.
///
/// Lunch does not count toward the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultShiftPolicy {
    pub min_work: u32,
    pub max_work: u32,
}

impl Default for DefaultShiftPolicy {
    fn default() -> Self {
        Self {
            min_work: 240,
            max_work: 480,
        }
    }
}

impl ShiftPolicy for DefaultShiftPolicy {
    fn min_work_minutes(&self) -> u32 {
        self.min_work
    }

    fn max_work_minutes(&self) -> u32 {
        self.max_work
    }
}

/// Default lunch policy.
///
/// - work < 6 h: no lunch
/// - 6 h ≤ work < 6.5 h: 30-minute lunch
/// - work ≥ 6.5 h: 60-minute lunch
///
/// Lunch starts within ±2 slots of the shift midpoint on normal days and
/// ±4 slots on busy days, and the lunch must lie strictly inside the shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultLunchPolicy {
    pub no_lunch_threshold: u32,
    pub short_lunch_threshold: u32,
    pub short_lunch_duration: u32,
    pub long_lunch_duration: u32,
    pub normal_day_slack_slots: usize,
    pub busy_day_slack_slots: usize,
}

impl Default for DefaultLunchPolicy {
    fn default() -> Self {
        Self {
            no_lunch_threshold: 360,
            short_lunch_threshold: 390,
            short_lunch_duration: 30,
            long_lunch_duration: 60,
            normal_day_slack_slots: 2,
            busy_day_slack_slots: 4,
        }
    }
}

impl LunchPolicy for DefaultLunchPolicy {
    fn lunch_minutes(&self, work_minutes: u32) -> u32 {
        if work_minutes < self.no_lunch_threshold {
            0
        } else if work_minutes < self.short_lunch_threshold {
            self.short_lunch_duration
        } else {
            self.long_lunch_duration
        }
    }

    fn lunch_window(
        &self,
        shift: SlotBlock,
        lunch_slots: usize,
        is_busy_day: bool,
    ) -> Option<(usize, usize)> {
        if lunch_slots == 0 || lunch_slots + 2 > shift.len() {
            return None;
        }
        let slack = if is_busy_day {
            self.busy_day_slack_slots
        } else {
            self.normal_day_slack_slots
        };
        let mid = shift.start_slot + shift.len() / 2;

        // Strictly inside: the lunch may touch neither shift boundary.
        let lo_bound = shift.start_slot + 1;
        let hi_bound = shift.end_slot - lunch_slots - 1;
        let earliest = mid.saturating_sub(slack).max(lo_bound);
        let latest = (mid + slack).min(hi_bound);
        (earliest <= latest).then_some((earliest, latest))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.short_lunch_threshold < self.no_lunch_threshold {
            return Err(ConfigError::InconsistentLunchPolicy {
                no: self.no_lunch_threshold,
                short: self.short_lunch_threshold,
            });
        }
        Ok(())
    }
}

/// Default break policy.
///
/// - work < 5 h: no break
/// - 5 h ≤ work < 8 h: one 15-minute break
/// - work ≥ 8 h: two 15-minute breaks
///
/// Breaks sit within ±2 slots of their anchor and keep at least one empty
/// slot between themselves and the lunch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultBreakPolicy {
    pub one_break_threshold: u32,
    pub two_break_threshold: u32,
    pub break_duration: u32,
    pub max_variance: usize,
    pub min_gap_from_lunch: usize,
}

impl Default for DefaultBreakPolicy {
    fn default() -> Self {
        Self {
            one_break_threshold: 300,
            two_break_threshold: 480,
            break_duration: 15,
            max_variance: 2,
            min_gap_from_lunch: 1,
        }
    }
}

impl BreakPolicy for DefaultBreakPolicy {
    fn break_count(&self, work_minutes: u32) -> usize {
        if work_minutes >= self.two_break_threshold {
            2
        } else if work_minutes >= self.one_break_threshold {
            1
        } else {
            0
        }
    }

    fn break_minutes(&self) -> u32 {
        self.break_duration
    }

    fn anchors(&self, shift: SlotBlock, count: usize) -> Vec<usize> {
        let len = shift.len();
        match count {
            1 => vec![shift.start_slot + len / 2],
            2 => vec![
                shift.start_slot + len / 3,
                shift.start_slot + 2 * len / 3,
            ],
            _ => Vec::new(),
        }
    }

    fn max_variance_slots(&self) -> usize {
        self.max_variance
    }

    fn min_gap_from_lunch_slots(&self) -> usize {
        self.min_gap_from_lunch
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.two_break_threshold < self.one_break_threshold {
            return Err(ConfigError::InconsistentBreakPolicy {
                one: self.one_break_threshold,
                two: self.two_break_threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_policy_bounds() {
        let policy = DefaultShiftPolicy::default();
        assert_eq!(policy.min_work_minutes(), 240);
        assert_eq!(policy.max_work_minutes(), 480);
        assert!(policy.is_valid_work(240));
        assert!(policy.is_valid_work(480));
        assert!(!policy.is_valid_work(239));
        assert!(!policy.is_valid_work(481));
    }

    #[test]
    fn test_lunch_duration_thresholds() {
        let policy = DefaultLunchPolicy::default();
        assert_eq!(policy.lunch_minutes(240), 0);
        assert_eq!(policy.lunch_minutes(359), 0);
        assert_eq!(policy.lunch_minutes(360), 30); // Exactly 6 hours
        assert_eq!(policy.lunch_minutes(389), 30);
        assert_eq!(policy.lunch_minutes(390), 60); // Exactly 6.5 hours
        assert_eq!(policy.lunch_minutes(480), 60);
    }

    #[test]
    fn test_break_count_thresholds() {
        let policy = DefaultBreakPolicy::default();
        assert_eq!(policy.break_count(299), 0);
        assert_eq!(policy.break_count(300), 1);
        assert_eq!(policy.break_count(479), 1);
        assert_eq!(policy.break_count(480), 2);
        assert_eq!(policy.break_minutes(), 15);
    }

    #[test]
    fn test_lunch_window_centers_on_midpoint() {
        let policy = DefaultLunchPolicy::default();
        // 36-slot shift, 4-slot lunch: midpoint 18, slack 2 → [16, 20].
        let (lo, hi) = policy
            .lunch_window(SlotBlock::new(0, 36), 4, false)
            .unwrap();
        assert_eq!((lo, hi), (16, 20));
    }

    #[test]
    fn test_lunch_window_widens_on_busy_day() {
        let policy = DefaultLunchPolicy::default();
        let (lo, hi) = policy.lunch_window(SlotBlock::new(0, 36), 4, true).unwrap();
        assert_eq!((lo, hi), (14, 22));
    }

    #[test]
    fn test_lunch_window_stays_strictly_inside() {
        let policy = DefaultLunchPolicy::default();
        // Short shift: window clamps to keep the lunch off both boundaries.
        let (lo, hi) = policy.lunch_window(SlotBlock::new(0, 6), 2, true).unwrap();
        assert!(lo >= 1);
        assert!(hi + 2 <= 5);
        // Lunch the size of the shift: impossible.
        assert!(policy.lunch_window(SlotBlock::new(0, 4), 4, false).is_none());
    }

    #[test]
    fn test_break_anchors() {
        let policy = DefaultBreakPolicy::default();
        let shift = SlotBlock::new(0, 36);
        assert_eq!(policy.anchors(shift, 1), vec![18]);
        assert_eq!(policy.anchors(shift, 2), vec![12, 24]);
        assert!(policy.anchors(shift, 0).is_empty());

        let offset = SlotBlock::new(10, 46);
        assert_eq!(policy.anchors(offset, 2), vec![22, 34]);
    }

    #[test]
    fn test_policy_validation_catches_inverted_thresholds() {
        let bad = DefaultLunchPolicy {
            short_lunch_threshold: 300,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = DefaultBreakPolicy {
            two_break_threshold: 200,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = DefaultShiftPolicy {
            min_work: 480,
            max_work: 240,
        };
        assert!(bad.validate().is_err());

        assert!(DefaultLunchPolicy::default().validate().is_ok());
        assert!(DefaultBreakPolicy::default().validate().is_ok());
        assert!(DefaultShiftPolicy::default().validate().is_ok());
    }
}

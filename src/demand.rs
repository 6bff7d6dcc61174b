//! Staffing demand curves, profiles, and match metrics.
//!
//! A demand curve is a per-slot staffing target the objective tries to
//! match. Profiles are named hourly patterns ("weekday", "weekend") that
//! expand into curves for concrete dates.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::TimeGrid;

/// Per-slot staffing targets for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandCurve {
    /// Target on-floor headcount per slot.
    pub targets: Vec<u32>,
}

impl DemandCurve {
    /// Creates a curve from explicit per-slot targets.
    pub fn new(targets: Vec<u32>) -> Self {
        Self { targets }
    }

    /// A flat curve of `target` across `slots` slots.
    pub fn constant(slots: usize, target: u32) -> Self {
        Self {
            targets: vec![target; slots],
        }
    }

    /// Number of slots covered.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the curve has no slots.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Target at `slot`; slots beyond the curve have target 0.
    #[inline]
    pub fn target_at(&self, slot: usize) -> u32 {
        self.targets.get(slot).copied().unwrap_or(0)
    }

    /// Sum of targets over all slots.
    pub fn total_target(&self) -> u64 {
        self.targets.iter().map(|&t| t as u64).sum()
    }

    /// Largest per-slot target.
    pub fn peak(&self) -> u32 {
        self.targets.iter().copied().max().unwrap_or(0)
    }

    /// Expands hourly targets into a per-slot curve on `grid`.
    ///
    /// `hourly_targets` maps the hour of day (0–23) to a headcount; hours
    /// without an entry get target 0.
    pub fn from_hourly_pattern(grid: &TimeGrid, hourly_targets: &BTreeMap<u32, u32>) -> Self {
        let targets = (0..grid.total_slots())
            .map(|slot| {
                let hour = grid.slot_start_minutes(slot) / 60;
                hourly_targets.get(&hour).copied().unwrap_or(0)
            })
            .collect();
        Self { targets }
    }
}

/// A named, reusable hourly demand pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandProfile {
    /// Profile name, e.g. "weekday".
    pub name: String,
    /// Hour of day (0–23) to target headcount.
    pub hourly_pattern: BTreeMap<u32, u32>,
}

impl DemandProfile {
    /// Creates a profile from an hourly pattern.
    pub fn new(name: impl Into<String>, hourly_pattern: BTreeMap<u32, u32>) -> Self {
        Self {
            name: name.into(),
            hourly_pattern,
        }
    }

    /// Typical weekday pattern: morning ramp, mid-morning and afternoon
    /// peaks, lunch dip, evening wind-down.
    pub fn weekday() -> Self {
        Self::new(
            "weekday",
            BTreeMap::from([
                (5, 2),
                (6, 3),
                (7, 5),
                (8, 7),
                (9, 9),
                (10, 10),
                (11, 10),
                (12, 8),
                (13, 9),
                (14, 10),
                (15, 9),
                (16, 8),
                (17, 7),
                (18, 6),
                (19, 5),
                (20, 4),
                (21, 3),
            ]),
        )
    }

    /// Typical weekend pattern: later, higher midday peak.
    pub fn weekend() -> Self {
        Self::new(
            "weekend",
            BTreeMap::from([
                (5, 1),
                (6, 2),
                (7, 3),
                (8, 5),
                (9, 7),
                (10, 9),
                (11, 11),
                (12, 12),
                (13, 12),
                (14, 11),
                (15, 10),
                (16, 9),
                (17, 8),
                (18, 7),
                (19, 6),
                (20, 4),
                (21, 2),
            ]),
        )
    }

    /// Scales every hourly target by `factor`, keeping a floor of 1.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            name: self.name.clone(),
            hourly_pattern: self
                .hourly_pattern
                .iter()
                .map(|(&h, &t)| (h, ((t as f64 * factor) as u32).max(1)))
                .collect(),
        }
    }

    /// Expands the profile into a curve for `grid`.
    pub fn to_curve(&self, grid: &TimeGrid) -> DemandCurve {
        DemandCurve::from_hourly_pattern(grid, &self.hourly_pattern)
    }
}

/// Demand configuration for a whole week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WeeklyDemand {
    /// Explicit curves by date.
    pub curves: BTreeMap<NaiveDate, DemandCurve>,
    /// Fallback profile for dates without an explicit curve.
    pub default_profile: Option<DemandProfile>,
}

impl WeeklyDemand {
    /// Creates an empty weekly demand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the curve for a date.
    pub fn with_curve(mut self, date: NaiveDate, curve: DemandCurve) -> Self {
        self.curves.insert(date, curve);
        self
    }

    /// Sets the fallback profile.
    pub fn with_default_profile(mut self, profile: DemandProfile) -> Self {
        self.default_profile = Some(profile);
        self
    }

    /// A standard week: weekday profile Mon–Fri, weekend profile Sat–Sun,
    /// both scaled to the roster size (`headcount / 10`, clamped to
    /// `[0.5, 2.0]`).
    pub fn standard_week(grid: &TimeGrid, dates: &[NaiveDate], headcount: usize) -> Self {
        let factor = (headcount as f64 / 10.0).clamp(0.5, 2.0);
        let weekday = DemandProfile::weekday().scaled(factor);
        let weekend = DemandProfile::weekend().scaled(factor);

        let mut weekly = Self::new();
        for &date in dates {
            let profile = if date.weekday().number_from_monday() <= 5 {
                &weekday
            } else {
                &weekend
            };
            weekly.curves.insert(date, profile.to_curve(grid));
        }
        weekly
    }

    /// Curve for a date: the explicit one, the default profile expanded,
    /// or `None`.
    pub fn curve_for(&self, date: NaiveDate, grid: &TimeGrid) -> Option<DemandCurve> {
        if let Some(curve) = self.curves.get(&date) {
            return Some(curve.clone());
        }
        self.default_profile.as_ref().map(|p| p.to_curve(grid))
    }
}

/// How well a coverage timeline matches a demand curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DemandMetrics {
    /// Σ target × slot minutes.
    pub total_target_minutes: f64,
    /// Σ min(coverage, target) × slot minutes.
    pub total_matched_minutes: f64,
    /// Minutes of staffing short of target.
    pub undercoverage_minutes: f64,
    /// Minutes of staffing beyond target.
    pub overcoverage_minutes: f64,
    /// Matched / target as a 0–100 percentage (100 when target is zero).
    pub match_score: f64,
    /// Slots where coverage fell short of target.
    pub slot_deficits: Vec<usize>,
    /// Slots where coverage exceeded target.
    pub slot_surpluses: Vec<usize>,
}

impl DemandMetrics {
    /// Computes metrics from a curve and a coverage timeline.
    pub fn calculate(curve: &DemandCurve, coverage: &[u32], slot_minutes: u32) -> Self {
        let mut total_target = 0u64;
        let mut matched = 0u64;
        let mut under = 0u64;
        let mut over = 0u64;
        let mut deficits = Vec::new();
        let mut surpluses = Vec::new();

        for (slot, &cov) in coverage.iter().enumerate() {
            let target = curve.target_at(slot);
            total_target += target as u64;
            matched += cov.min(target) as u64;
            if cov < target {
                under += (target - cov) as u64;
                deficits.push(slot);
            } else if cov > target {
                over += (cov - target) as u64;
                surpluses.push(slot);
            }
        }

        let match_score = if total_target == 0 {
            100.0
        } else {
            matched as f64 / total_target as f64 * 100.0
        };

        let minutes = slot_minutes as f64;
        Self {
            total_target_minutes: total_target as f64 * minutes,
            total_matched_minutes: matched as f64 * minutes,
            undercoverage_minutes: under as f64 * minutes,
            overcoverage_minutes: over as f64 * minutes,
            match_score,
            slot_deficits: deficits,
            slot_surpluses: surpluses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_constant_curve() {
        let curve = DemandCurve::constant(68, 2);
        assert_eq!(curve.len(), 68);
        assert_eq!(curve.target_at(0), 2);
        assert_eq!(curve.target_at(67), 2);
        assert_eq!(curve.target_at(68), 0); // Out of range
        assert_eq!(curve.total_target(), 136);
        assert_eq!(curve.peak(), 2);
    }

    #[test]
    fn test_hourly_pattern_expansion() {
        let grid = TimeGrid::default();
        let curve = DemandCurve::from_hourly_pattern(
            &grid,
            &BTreeMap::from([(5, 2), (6, 4)]),
        );
        assert_eq!(curve.len(), 68);
        // Slots 0-3 are the 5 o'clock hour, 4-7 the 6 o'clock hour.
        assert_eq!(curve.target_at(0), 2);
        assert_eq!(curve.target_at(3), 2);
        assert_eq!(curve.target_at(4), 4);
        assert_eq!(curve.target_at(8), 0); // 7 o'clock has no entry
    }

    #[test]
    fn test_profile_scaling_floors_at_one() {
        let profile = DemandProfile::weekday().scaled(0.1);
        assert!(profile.hourly_pattern.values().all(|&t| t >= 1));

        let doubled = DemandProfile::weekday().scaled(2.0);
        assert_eq!(doubled.hourly_pattern[&10], 20);
    }

    #[test]
    fn test_standard_week_uses_weekend_profile() {
        let grid = TimeGrid::default();
        // 2026-08-03 is a Monday, 2026-08-08 a Saturday.
        let dates = vec![d("2026-08-03"), d("2026-08-08")];
        let weekly = WeeklyDemand::standard_week(&grid, &dates, 10);

        let monday = weekly.curve_for(d("2026-08-03"), &grid).unwrap();
        let saturday = weekly.curve_for(d("2026-08-08"), &grid).unwrap();
        // Weekend peaks at 12 vs weekday 10 (scale factor 1.0).
        assert_eq!(monday.peak(), 10);
        assert_eq!(saturday.peak(), 12);
    }

    #[test]
    fn test_curve_for_falls_back_to_profile() {
        let grid = TimeGrid::default();
        let weekly = WeeklyDemand::new().with_default_profile(DemandProfile::weekday());
        assert!(weekly.curve_for(d("2026-08-03"), &grid).is_some());

        let empty = WeeklyDemand::new();
        assert!(empty.curve_for(d("2026-08-03"), &grid).is_none());
    }

    #[test]
    fn test_metrics_perfect_match() {
        let curve = DemandCurve::constant(4, 2);
        let metrics = DemandMetrics::calculate(&curve, &[2, 2, 2, 2], 15);
        assert!((metrics.match_score - 100.0).abs() < 1e-9);
        assert_eq!(metrics.undercoverage_minutes, 0.0);
        assert_eq!(metrics.overcoverage_minutes, 0.0);
        assert!(metrics.slot_deficits.is_empty());
    }

    #[test]
    fn test_metrics_under_and_over() {
        let curve = DemandCurve::constant(4, 2);
        let metrics = DemandMetrics::calculate(&curve, &[1, 2, 3, 0], 15);
        // Matched: 1 + 2 + 2 + 0 = 5 of 8.
        assert!((metrics.match_score - 62.5).abs() < 1e-9);
        assert_eq!(metrics.undercoverage_minutes, 45.0); // (1 + 2) slots × 15
        assert_eq!(metrics.overcoverage_minutes, 15.0);
        assert_eq!(metrics.slot_deficits, vec![0, 3]);
        assert_eq!(metrics.slot_surpluses, vec![2]);
    }

    #[test]
    fn test_metrics_zero_target_scores_100() {
        let curve = DemandCurve::constant(4, 0);
        let metrics = DemandMetrics::calculate(&curve, &[1, 0, 0, 0], 15);
        assert!((metrics.match_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_curve_serde_round_trip() {
        let curve = DemandCurve::new(vec![1, 2, 3, 2, 1]);
        let json = serde_json::to_string(&curve).unwrap();
        let decoded: DemandCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(curve, decoded);
    }
}

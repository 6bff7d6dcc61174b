//! Weekly schedule container and fairness metrics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::schedule::DaySchedule;

/// Weight of the hours-spread term in the fairness score.
const HOURS_SPREAD_WEIGHT: f64 = 50.0;
/// Weight of the days-spread term in the fairness score.
const DAYS_SPREAD_WEIGHT: f64 = 50.0;

/// Balance metrics for a weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FairnessMetrics {
    /// Work minutes per associate across the week.
    pub minutes_per_associate: BTreeMap<String, u32>,
    /// Days worked per associate.
    pub days_per_associate: BTreeMap<String, u32>,
    /// Mean hours across associates.
    pub avg_hours: f64,
    /// Standard deviation of hours.
    pub hours_std_dev: f64,
    /// Fewest hours any associate works.
    pub min_hours: f64,
    /// Most hours any associate works.
    pub max_hours: f64,
    /// 0–100 balance summary; 100 means perfectly even hours and days.
    pub fairness_score: f64,
}

impl FairnessMetrics {
    /// Computes metrics from weekly minute and day tallies.
    ///
    /// Score: `100 − (σ_h/μ_h·50 + σ_d/μ_d·50)`, clamped to `[0, 100]`.
    /// An empty roster scores 100.
    pub fn calculate(
        minutes: BTreeMap<String, u32>,
        days: BTreeMap<String, u32>,
    ) -> Self {
        if minutes.is_empty() {
            return Self {
                fairness_score: 100.0,
                ..Self::default()
            };
        }

        let hours: Vec<f64> = minutes.values().map(|&m| m as f64 / 60.0).collect();
        let (hours_mean, hours_std) = mean_and_std(&hours);

        let day_counts: Vec<f64> = days.values().map(|&d| d as f64).collect();
        let (days_mean, days_std) = mean_and_std(&day_counts);

        let mut penalty = 0.0;
        if hours_mean > 0.0 {
            penalty += hours_std / hours_mean * HOURS_SPREAD_WEIGHT;
        }
        if days_mean > 0.0 {
            penalty += days_std / days_mean * DAYS_SPREAD_WEIGHT;
        }

        Self {
            avg_hours: hours_mean,
            hours_std_dev: hours_std,
            min_hours: hours.iter().copied().fold(f64::INFINITY, f64::min),
            max_hours: hours.iter().copied().fold(0.0, f64::max),
            fairness_score: (100.0 - penalty).clamp(0.0, 100.0),
            minutes_per_associate: minutes,
            days_per_associate: days,
        }
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

/// Complete schedule output for a week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    /// First date of the period.
    pub start_date: NaiveDate,
    /// Last date of the period (inclusive).
    pub end_date: NaiveDate,
    /// Daily schedules in date order.
    pub days: BTreeMap<NaiveDate, DaySchedule>,
    /// Balance metrics, filled after all days are solved.
    pub fairness: Option<FairnessMetrics>,
}

impl WeeklySchedule {
    /// Creates an empty weekly schedule.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            days: BTreeMap::new(),
            fairness: None,
        }
    }

    /// Total work minutes for an associate across the week.
    pub fn weekly_minutes(&self, associate_id: &str) -> u32 {
        self.days
            .values()
            .filter_map(|day| {
                day.assignments
                    .get(associate_id)
                    .map(|a| a.work_minutes(&day.grid))
            })
            .sum()
    }

    /// Number of days an associate works.
    pub fn days_worked(&self, associate_id: &str) -> u32 {
        self.days
            .values()
            .filter(|day| day.assignments.contains_key(associate_id))
            .count() as u32
    }

    /// Dates on which an associate does not work, in order.
    pub fn days_off(&self, associate_id: &str) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|(_, day)| !day.assignments.contains_key(associate_id))
            .map(|(&date, _)| date)
            .collect()
    }

    /// Total shifts across the week.
    pub fn total_shifts(&self) -> usize {
        self.days.values().map(|d| d.assignments.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::ShiftAssignment;
    use crate::models::time::{SlotBlock, TimeGrid};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_perfectly_even_week_scores_100() {
        let minutes = BTreeMap::from([("A".into(), 2400), ("B".into(), 2400)]);
        let days = BTreeMap::from([("A".into(), 5), ("B".into(), 5)]);
        let metrics = FairnessMetrics::calculate(minutes, days);
        assert!((metrics.fairness_score - 100.0).abs() < 1e-9);
        assert!((metrics.avg_hours - 40.0).abs() < 1e-9);
        assert!(metrics.hours_std_dev.abs() < 1e-9);
    }

    #[test]
    fn test_uneven_week_scores_below_100() {
        let minutes = BTreeMap::from([("A".into(), 2400), ("B".into(), 600)]);
        let days = BTreeMap::from([("A".into(), 5), ("B".into(), 2)]);
        let metrics = FairnessMetrics::calculate(minutes, days);
        assert!(metrics.fairness_score < 100.0);
        assert!(metrics.fairness_score >= 0.0);
        assert!((metrics.max_hours - 40.0).abs() < 1e-9);
        assert!((metrics.min_hours - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_roster_scores_100() {
        let metrics = FairnessMetrics::calculate(BTreeMap::new(), BTreeMap::new());
        assert!((metrics.fairness_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        // Extreme spread: one associate does everything.
        let minutes = BTreeMap::from([
            ("A".into(), 2400),
            ("B".into(), 0),
            ("C".into(), 0),
            ("D".into(), 0),
        ]);
        let days = BTreeMap::from([
            ("A".into(), 7),
            ("B".into(), 0),
            ("C".into(), 0),
            ("D".into(), 0),
        ]);
        let metrics = FairnessMetrics::calculate(minutes, days);
        assert!(metrics.fairness_score >= 0.0);
    }

    #[test]
    fn test_weekly_tallies() {
        let mut weekly = WeeklySchedule::new(d("2026-08-03"), d("2026-08-04"));
        let grid = TimeGrid::default();

        let mut day1 = DaySchedule::new(d("2026-08-03"), grid);
        day1.insert(ShiftAssignment::new("A1", SlotBlock::new(0, 16)));
        weekly.days.insert(day1.date, day1);

        let mut day2 = DaySchedule::new(d("2026-08-04"), grid);
        day2.insert(ShiftAssignment::new("A1", SlotBlock::new(0, 16)));
        weekly.days.insert(day2.date, day2);

        assert_eq!(weekly.weekly_minutes("A1"), 480);
        assert_eq!(weekly.days_worked("A1"), 2);
        assert_eq!(weekly.days_off("A1"), Vec::<NaiveDate>::new());
        assert_eq!(weekly.days_worked("A2"), 0);
        assert_eq!(weekly.days_off("A2").len(), 2);
        assert_eq!(weekly.total_shifts(), 2);
    }
}

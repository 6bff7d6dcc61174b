//! Seeded demo-data synthesis.
//!
//! Builds rosters of associates with varied availability windows, days-off
//! habits, hour limits, role restrictions, and preferences. Used by the
//! CLI demos and handy for examples; everything flows from the seed, so a
//! given `(count, dates, seed)` triple always produces the same roster.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Associate, Availability, JobRole, Preference};

const NAMES: [&str; 24] = [
    "Alice", "Bob", "Carol", "David", "Eve", "Frank", "Grace", "Henry", "Ivy", "Jack", "Kate",
    "Leo", "Mia", "Noah", "Olivia", "Paul", "Quinn", "Rose", "Sam", "Tina", "Uma", "Victor",
    "Wendy", "Xavier",
];

/// Availability windows in slots (5:00 = slot 0, 15-minute slots):
/// openers, mid-day shifts, closers, and full-day flex.
const SHIFT_WINDOWS: [(usize, usize); 10] = [
    (0, 32),  // 05:00-13:00
    (0, 40),  // 05:00-15:00
    (4, 36),  // 06:00-14:00
    (12, 44), // 08:00-16:00
    (20, 52), // 10:00-18:00
    (28, 60), // 12:00-20:00
    (36, 68), // 14:00-22:00
    (44, 68), // 16:00-22:00
    (0, 68),  // full day
    (12, 52), // 08:00-18:00
];

/// Weekday-off habits (0 = Monday).
const DAYS_OFF_HABITS: [&[u32]; 8] = [
    &[5, 6],
    &[0, 1],
    &[2, 3],
    &[6, 0],
    &[1, 4],
    &[5],
    &[6],
    &[],
];

/// (max daily minutes, max weekly minutes).
const HOUR_LIMITS: [(u32, u32); 5] = [
    (480, 2400),
    (480, 2000),
    (360, 1800),
    (480, 1600),
    (360, 1200),
];

const RESTRICTIONS: [&[JobRole]; 6] = [
    &[],
    &[JobRole::Backroom],
    &[JobRole::GmdSm],
    &[JobRole::Staging],
    &[JobRole::GmdSm, JobRole::ExceptionSm],
    &[JobRole::Staging, JobRole::Backroom],
];

const PREFERENCES: [&[(JobRole, Preference)]; 6] = [
    &[],
    &[(JobRole::Picking, Preference::Prefer)],
    &[(JobRole::Backroom, Preference::Prefer)],
    &[(JobRole::Staging, Preference::Avoid)],
    &[(JobRole::GmdSm, Preference::Prefer)],
    &[
        (JobRole::Picking, Preference::Prefer),
        (JobRole::Backroom, Preference::Avoid),
    ],
];

/// Creates `count` associates with availability over `dates`.
pub fn sample_associates(count: usize, dates: &[NaiveDate], seed: u64) -> Vec<Associate> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut associates = Vec::with_capacity(count);

    for index in 0..count {
        let name = NAMES[index % NAMES.len()];
        let id = format!("A{:03}", index + 1);

        let (window_start, window_end) = SHIFT_WINDOWS[rng.gen_range(0..SHIFT_WINDOWS.len())];
        let habit = DAYS_OFF_HABITS[rng.gen_range(0..DAYS_OFF_HABITS.len())];
        let (max_day, max_week) = HOUR_LIMITS[rng.gen_range(0..HOUR_LIMITS.len())];
        let restricted = RESTRICTIONS[rng.gen_range(0..RESTRICTIONS.len())];
        let preferences = PREFERENCES[rng.gen_range(0..PREFERENCES.len())];

        let mut associate = Associate::new(id, name)
            .with_max_minutes_per_day(max_day)
            .with_max_minutes_per_week(max_week)
            .with_cannot_do(restricted.iter().copied());
        for &(role, preference) in preferences {
            associate = associate.with_preference(role, preference);
        }

        for &date in dates {
            let weekday = date.weekday().num_days_from_monday();
            let availability = if habit.contains(&weekday) {
                Availability::off_day()
            } else {
                Availability::new(window_start, window_end)
            };
            associate = associate.with_availability(date, availability);
        }

        associates.push(associate);
    }

    associates
}

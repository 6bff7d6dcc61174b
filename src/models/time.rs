//! Slot arithmetic and the operating window.
//!
//! All scheduling happens on a discrete grid: the operating window
//! `[day_start, day_end)` (minutes from midnight) is divided into
//! `slot_minutes`-long slots indexed `0..S`. Everything downstream —
//! candidates, assignments, demand curves — speaks slot indices, so the
//! canonical exchange form is independent of the wall-clock window.

use serde::{Deserialize, Serialize};

/// The discrete time grid for one schedule day.
///
/// Defaults to 5:00–22:00 at 15-minute resolution (68 slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Minutes from midnight when the operating window opens.
    pub day_start_minutes: u32,
    /// Minutes from midnight when the operating window closes (exclusive).
    pub day_end_minutes: u32,
    /// Length of one slot in minutes.
    pub slot_minutes: u32,
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self {
            day_start_minutes: 300,
            day_end_minutes: 1320,
            slot_minutes: 15,
        }
    }
}

impl TimeGrid {
    /// Creates a grid from an explicit window.
    pub fn new(day_start_minutes: u32, day_end_minutes: u32, slot_minutes: u32) -> Self {
        Self {
            day_start_minutes,
            day_end_minutes,
            slot_minutes,
        }
    }

    /// Number of slots in the day.
    #[inline]
    pub fn total_slots(&self) -> usize {
        if self.slot_minutes == 0 || self.day_end_minutes <= self.day_start_minutes {
            return 0;
        }
        ((self.day_end_minutes - self.day_start_minutes) / self.slot_minutes) as usize
    }

    /// Minutes from midnight when `slot` starts.
    #[inline]
    pub fn slot_start_minutes(&self, slot: usize) -> u32 {
        self.day_start_minutes + slot as u32 * self.slot_minutes
    }

    /// Converts a slot count to minutes.
    #[inline]
    pub fn slots_to_minutes(&self, slots: usize) -> u32 {
        slots as u32 * self.slot_minutes
    }

    /// Converts minutes to slots, rounding up to the next whole slot.
    ///
    /// Policy values that are not a multiple of `slot_minutes` round up.
    #[inline]
    pub fn minutes_to_slots_ceil(&self, minutes: u32) -> usize {
        if self.slot_minutes == 0 {
            return 0;
        }
        ((minutes + self.slot_minutes - 1) / self.slot_minutes) as usize
    }

    /// Formats a slot start as `HH:MM` for human-facing output.
    pub fn slot_label(&self, slot: usize) -> String {
        let minutes = self.slot_start_minutes(slot);
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }
}

/// A contiguous half-open run of slots `[start_slot, end_slot)`.
///
/// Used for shifts, lunches, rest breaks, and role blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotBlock {
    /// First slot of the block (inclusive).
    pub start_slot: usize,
    /// Last slot of the block (exclusive).
    pub end_slot: usize,
}

impl SlotBlock {
    /// Creates a new block.
    pub fn new(start_slot: usize, end_slot: usize) -> Self {
        Self {
            start_slot,
            end_slot,
        }
    }

    /// Number of slots in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.end_slot.saturating_sub(self.start_slot)
    }

    /// Whether the block covers no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_slot <= self.start_slot
    }

    /// Whether `slot` falls inside the block.
    #[inline]
    pub fn contains(&self, slot: usize) -> bool {
        self.start_slot <= slot && slot < self.end_slot
    }

    /// Whether two blocks share at least one slot.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_slot < other.end_slot && other.start_slot < self.end_slot
    }

    /// Whether the block lies strictly inside `outer` (no shared boundary).
    #[inline]
    pub fn strictly_inside(&self, outer: &Self) -> bool {
        self.start_slot > outer.start_slot && self.end_slot < outer.end_slot
    }

    /// Duration of the block on the given grid.
    #[inline]
    pub fn duration_minutes(&self, grid: &TimeGrid) -> u32 {
        grid.slots_to_minutes(self.len())
    }

    /// Iterator over the slots in the block.
    pub fn slots(&self) -> std::ops::Range<usize> {
        self.start_slot..self.end_slot
    }
}

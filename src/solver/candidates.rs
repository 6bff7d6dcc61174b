//! Feasible shift-candidate enumeration.
//!
//! For each (associate, date) the generator enumerates every shift the
//! policies allow: start and length within availability, the policy lunch
//! inserted at each admissible start, and breaks placed at the nearest
//! in-band position around their anchors. A candidate is a fully concrete
//! placement, so its on-floor mask is known before any solver runs.
//!
//! Candidates are deduplicated and sorted by decreasing work minutes, then
//! earlier start, then earlier lunch, then earlier first break — a total
//! order, so downstream iteration is deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::models::{Associate, ScheduleRequest, SlotBlock};
use crate::policies::{
    BreakPolicy, DefaultBreakPolicy, DefaultLunchPolicy, DefaultShiftPolicy, LunchPolicy,
    ShiftPolicy,
};

/// A concrete feasible shift option for one associate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShiftCandidate {
    /// Associate this candidate belongs to.
    pub associate_id: String,
    /// The whole shift, lunch included.
    pub shift: SlotBlock,
    /// Work minutes (shift minus lunch; breaks count as work).
    pub work_minutes: u32,
    /// Lunch placement, if required.
    pub lunch: Option<SlotBlock>,
    /// Break placements, in start order.
    pub breaks: Vec<SlotBlock>,
}

impl ShiftCandidate {
    /// Whether the associate would be on floor at `slot`.
    pub fn is_on_floor(&self, slot: usize) -> bool {
        if !self.shift.contains(slot) {
            return false;
        }
        if self.lunch.is_some_and(|l| l.contains(slot)) {
            return false;
        }
        !self.breaks.iter().any(|b| b.contains(slot))
    }

    /// Slots where the associate would be on floor.
    pub fn on_floor_slots(&self) -> Vec<usize> {
        self.shift.slots().filter(|&s| self.is_on_floor(s)).collect()
    }
}

/// Generates feasible shift candidates under the configured policies.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    shift_policy: Arc<dyn ShiftPolicy>,
    lunch_policy: Arc<dyn LunchPolicy>,
    break_policy: Arc<dyn BreakPolicy>,
    /// Granularity for start positions and lengths, in slots.
    step_slots: usize,
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateGenerator {
    /// Creates a generator with default policies and 2-slot granularity.
    pub fn new() -> Self {
        Self {
            shift_policy: Arc::new(DefaultShiftPolicy::default()),
            lunch_policy: Arc::new(DefaultLunchPolicy::default()),
            break_policy: Arc::new(DefaultBreakPolicy::default()),
            step_slots: 2,
        }
    }

    /// Creates a generator over explicit policies.
    pub fn with_policies(
        shift_policy: Arc<dyn ShiftPolicy>,
        lunch_policy: Arc<dyn LunchPolicy>,
        break_policy: Arc<dyn BreakPolicy>,
    ) -> Self {
        Self {
            shift_policy,
            lunch_policy,
            break_policy,
            step_slots: 2,
        }
    }

    /// Sets the enumeration granularity (1 = every slot).
    pub fn with_step_slots(mut self, step_slots: usize) -> Self {
        self.step_slots = step_slots.max(1);
        self
    }

    /// All feasible candidates for one associate on the request's date.
    pub fn generate(&self, associate: &Associate, request: &ScheduleRequest) -> Vec<ShiftCandidate> {
        let grid = &request.grid;
        let availability = associate.availability_on(request.date);
        if availability.is_off() {
            return Vec::new();
        }

        let total_slots = grid.total_slots();
        let avail_start = availability.start_slot;
        let avail_end = availability.end_slot.min(total_slots);
        if avail_end <= avail_start {
            return Vec::new();
        }

        let min_work_slots = grid.minutes_to_slots_ceil(self.shift_policy.min_work_minutes());
        let max_work_minutes = self
            .shift_policy
            .max_work_minutes()
            .min(associate.max_minutes_per_day);
        if avail_end - avail_start < min_work_slots {
            return Vec::new();
        }

        let break_slots = grid
            .minutes_to_slots_ceil(self.break_policy.break_minutes())
            .max(1);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        let mut start = avail_start;
        while start < avail_end {
            let mut work_slots = min_work_slots;
            loop {
                let work_minutes = grid.slots_to_minutes(work_slots);
                if work_minutes > max_work_minutes {
                    break;
                }

                let lunch_minutes = self.lunch_policy.lunch_minutes(work_minutes);
                let lunch_slots = grid.minutes_to_slots_ceil(lunch_minutes);
                let end = start + work_slots + lunch_slots;
                if end > avail_end {
                    work_slots += self.step_slots;
                    continue;
                }

                let shift = SlotBlock::new(start, end);
                let break_count = self.break_policy.break_count(work_minutes);

                if lunch_slots == 0 {
                    self.emit(
                        associate,
                        shift,
                        work_minutes,
                        None,
                        break_count,
                        break_slots,
                        &mut seen,
                        &mut candidates,
                    );
                } else if let Some((earliest, latest)) =
                    self.lunch_policy
                        .lunch_window(shift, lunch_slots, request.is_busy_day)
                {
                    for lunch_start in earliest..=latest {
                        let lunch = SlotBlock::new(lunch_start, lunch_start + lunch_slots);
                        self.emit(
                            associate,
                            shift,
                            work_minutes,
                            Some(lunch),
                            break_count,
                            break_slots,
                            &mut seen,
                            &mut candidates,
                        );
                    }
                }

                work_slots += self.step_slots;
            }
            start += self.step_slots;
        }

        candidates.sort_by(|a, b| {
            b.work_minutes
                .cmp(&a.work_minutes)
                .then(a.shift.start_slot.cmp(&b.shift.start_slot))
                .then(
                    a.lunch
                        .map(|l| l.start_slot)
                        .cmp(&b.lunch.map(|l| l.start_slot)),
                )
                .then(
                    a.breaks
                        .first()
                        .map(|b| b.start_slot)
                        .cmp(&b.breaks.first().map(|b| b.start_slot)),
                )
        });
        candidates
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        associate: &Associate,
        shift: SlotBlock,
        work_minutes: u32,
        lunch: Option<SlotBlock>,
        break_count: usize,
        break_slots: usize,
        seen: &mut HashSet<(SlotBlock, Option<SlotBlock>, Vec<SlotBlock>)>,
        out: &mut Vec<ShiftCandidate>,
    ) {
        let Some(breaks) = place_breaks(
            self.break_policy.as_ref(),
            shift,
            lunch,
            break_count,
            break_slots,
        ) else {
            return;
        };
        if seen.insert((shift, lunch, breaks.clone())) {
            out.push(ShiftCandidate {
                associate_id: associate.id.clone(),
                shift,
                work_minutes,
                lunch,
                breaks,
            });
        }
    }

    /// Candidates for every associate in the request, keyed by id.
    ///
    /// Associates with no feasible candidate are omitted; the scheduler
    /// records them as unscheduled.
    pub fn generate_all(&self, request: &ScheduleRequest) -> HashMap<String, Vec<ShiftCandidate>> {
        let mut all = HashMap::new();
        for associate in &request.associates {
            let candidates = self.generate(associate, request);
            if candidates.is_empty() {
                debug!(associate = %associate.id, date = %request.date, "no feasible shift candidates");
            } else {
                all.insert(associate.id.clone(), candidates);
            }
        }
        all
    }
}

/// Places `count` breaks of `break_slots` slots near their policy anchors,
/// avoiding the lunch.
///
/// Each break must start within the anchor's variance band, lie strictly
/// inside the shift, keep the policy gap from the lunch, and not overlap a
/// previously placed break. Offsets are probed outward from the anchor
/// (0, +1, −1, …) so the result is deterministic. Returns `None` when any
/// break has no valid position — the shift shape is then infeasible.
pub(crate) fn place_breaks(
    policy: &dyn BreakPolicy,
    shift: SlotBlock,
    lunch: Option<SlotBlock>,
    count: usize,
    break_slots: usize,
) -> Option<Vec<SlotBlock>> {
    if count == 0 {
        return Some(Vec::new());
    }

    let variance = policy.max_variance_slots();
    let gap = policy.min_gap_from_lunch_slots();
    let anchors = policy.anchors(shift, count);

    let mut placed: Vec<SlotBlock> = Vec::with_capacity(count);
    for &anchor in &anchors {
        let mut found = None;
        for distance in 0..=variance {
            for offset in [distance as isize, -(distance as isize)] {
                if offset < 0 && distance == 0 {
                    continue;
                }
                let Some(start) = anchor.checked_add_signed(offset) else {
                    continue;
                };
                let block = SlotBlock::new(start, start + break_slots);
                if !block.strictly_inside(&shift) {
                    continue;
                }
                if let Some(lunch) = lunch {
                    let separated = block.end_slot + gap <= lunch.start_slot
                        || lunch.end_slot + gap <= block.start_slot;
                    if !separated {
                        continue;
                    }
                }
                if placed.iter().any(|other| block.overlaps(other)) {
                    continue;
                }
                found = Some(block);
                break;
            }
            if found.is_some() {
                break;
            }
        }
        placed.push(found?);
    }

    placed.sort_by_key(|b| b.start_slot);
    Some(placed)
}

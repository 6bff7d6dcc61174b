//! Role assignment shared by both solvers.
//!
//! Roles are assigned per work period, so a role can only change across a
//! lunch or break boundary — which is exactly the continuity rule. The
//! ladder for each period: keep the previous period's role, then a
//! preferred role, then constrained roles in priority order, then Picking
//! as overflow, then anything eligible that still has capacity.

use crate::models::{
    Associate, DaySchedule, JobRole, Preference, RoleBlock, ScheduleRequest, ShiftAssignment,
    SlotBlock,
};

/// Constrained roles in the order they should be staffed.
const CONSTRAINED_PRIORITY: [JobRole; 5] = [
    JobRole::GmdSm,
    JobRole::ExceptionSm,
    JobRole::Staging,
    JobRole::Backroom,
    JobRole::Sr,
];

/// Per-slot role occupancy counts for one day.
#[derive(Debug, Clone)]
pub(crate) struct RoleCounts {
    counts: Vec<[u32; JobRole::ALL.len()]>,
}

impl RoleCounts {
    pub fn new(total_slots: usize) -> Self {
        Self {
            counts: vec![[0; JobRole::ALL.len()]; total_slots],
        }
    }

    /// Whether `role` is below its cap at every slot of `block`.
    pub fn under_cap(&self, request: &ScheduleRequest, role: JobRole, block: SlotBlock) -> bool {
        let cap = request.job_cap(role);
        block
            .slots()
            .all(|slot| self.counts.get(slot).map_or(true, |c| c[role.index()] < cap))
    }

    /// Records `role` as held over `block`.
    pub fn commit(&mut self, role: JobRole, block: SlotBlock) {
        for slot in block.slots() {
            if let Some(counts) = self.counts.get_mut(slot) {
                counts[role.index()] += 1;
            }
        }
    }
}

/// Assigns a role to every work period of `assignment`.
///
/// Periods that cannot be staffed are left without a role block (the
/// validator reports them). Returns `false` when no period at all could be
/// staffed — the caller should drop the shift and leave the associate
/// unscheduled.
pub(crate) fn assign_roles(
    assignment: &mut ShiftAssignment,
    associate: &Associate,
    request: &ScheduleRequest,
    counts: &mut RoleCounts,
) -> bool {
    let eligible = associate.eligible_roles();
    if eligible.is_empty() {
        return false;
    }

    let mut previous: Option<JobRole> = None;
    let mut blocks = Vec::new();

    for period in assignment.work_periods() {
        let role = select_role(associate, request, counts, period, previous, &eligible);
        if let Some(role) = role {
            counts.commit(role, period);
            blocks.push(RoleBlock {
                role,
                block: period,
            });
            previous = Some(role);
        }
    }

    let assigned_any = !blocks.is_empty();
    assignment.roles = blocks;
    assigned_any
}

fn select_role(
    associate: &Associate,
    request: &ScheduleRequest,
    counts: &RoleCounts,
    period: SlotBlock,
    previous: Option<JobRole>,
    eligible: &std::collections::BTreeSet<JobRole>,
) -> Option<JobRole> {
    // Continuity: carry the previous period's role across the boundary.
    if let Some(prev) = previous {
        if counts.under_cap(request, prev, period) {
            return Some(prev);
        }
    }

    // A preferred role with room.
    for role in JobRole::ALL {
        if eligible.contains(&role)
            && associate.preference_for(role) == Preference::Prefer
            && counts.under_cap(request, role, period)
        {
            return Some(role);
        }
    }

    // Constrained roles that still need staffing, skipping avoided ones.
    for role in CONSTRAINED_PRIORITY {
        if eligible.contains(&role)
            && associate.preference_for(role) != Preference::Avoid
            && counts.under_cap(request, role, period)
        {
            return Some(role);
        }
    }

    // Picking absorbs overflow.
    if eligible.contains(&JobRole::Picking)
        && counts.under_cap(request, JobRole::Picking, period)
    {
        return Some(JobRole::Picking);
    }

    // Last resort: anything eligible with room, avoided or not.
    JobRole::ALL
        .into_iter()
        .find(|role| eligible.contains(role) && counts.under_cap(request, *role, period))
}

/// Fills `schedule.unscheduled` with every associate who was available on
/// the day but holds no assignment, sorted by id.
pub(crate) fn record_unscheduled(schedule: &mut DaySchedule, request: &ScheduleRequest) {
    let mut unscheduled: Vec<String> = request
        .associates
        .iter()
        .filter(|a| !a.availability_on(request.date).is_off())
        .filter(|a| !schedule.assignments.contains_key(&a.id))
        .map(|a| a.id.clone())
        .collect();
    unscheduled.sort();
    schedule.unscheduled = unscheduled;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn request(associates: Vec<Associate>) -> ScheduleRequest {
        ScheduleRequest::new(d("2026-08-03"), associates)
    }

    fn shift_4h(id: &str) -> ShiftAssignment {
        // 16 slots, no lunch, no break: one work period.
        ShiftAssignment::new(id, SlotBlock::new(0, 16))
    }

    #[test]
    fn test_constrained_role_filled_first() {
        let associate = Associate::new("A1", "Alice")
            .with_availability(d("2026-08-03"), Availability::new(0, 68));
        let request = request(vec![associate.clone()]);
        let mut counts = RoleCounts::new(68);
        let mut assignment = shift_4h("A1");

        assert!(assign_roles(&mut assignment, &associate, &request, &mut counts));
        assert_eq!(assignment.roles.len(), 1);
        assert_eq!(assignment.roles[0].role, JobRole::GmdSm);
    }

    #[test]
    fn test_cap_pushes_overflow_to_picking() {
        let a1 = Associate::new("A1", "Alice")
            .with_availability(d("2026-08-03"), Availability::new(0, 68))
            .with_allowed_roles([JobRole::GmdSm, JobRole::Picking]);
        let a2 = a1.clone();
        let mut request = request(vec![a1.clone()]);
        request.job_caps.insert(JobRole::GmdSm, 1);

        let mut counts = RoleCounts::new(68);
        let mut first = shift_4h("A1");
        let mut second = shift_4h("A2");

        assert!(assign_roles(&mut first, &a1, &request, &mut counts));
        assert!(assign_roles(&mut second, &a2, &request, &mut counts));
        assert_eq!(first.roles[0].role, JobRole::GmdSm);
        assert_eq!(second.roles[0].role, JobRole::Picking);
    }

    #[test]
    fn test_no_capacity_anywhere_drops_shift() {
        let a1 = Associate::new("A1", "Alice")
            .with_availability(d("2026-08-03"), Availability::new(0, 68))
            .with_allowed_roles([JobRole::GmdSm]);
        let a2 = a1.clone();
        let mut request = request(vec![a1.clone()]);
        request.job_caps.insert(JobRole::GmdSm, 1);

        let mut counts = RoleCounts::new(68);
        let mut first = shift_4h("A1");
        let mut second = shift_4h("A2");

        assert!(assign_roles(&mut first, &a1, &request, &mut counts));
        // No Picking fallback and GmdSm saturated: nothing assignable.
        assert!(!assign_roles(&mut second, &a2, &request, &mut counts));
        assert!(second.roles.is_empty());
    }

    #[test]
    fn test_preferred_role_wins_over_priority_order() {
        let associate = Associate::new("A1", "Alice")
            .with_availability(d("2026-08-03"), Availability::new(0, 68))
            .with_preference(JobRole::Backroom, Preference::Prefer);
        let request = request(vec![associate.clone()]);
        let mut counts = RoleCounts::new(68);
        let mut assignment = shift_4h("A1");

        assert!(assign_roles(&mut assignment, &associate, &request, &mut counts));
        assert_eq!(assignment.roles[0].role, JobRole::Backroom);
    }

    #[test]
    fn test_continuity_across_break() {
        let associate = Associate::new("A1", "Alice")
            .with_availability(d("2026-08-03"), Availability::new(0, 68));
        let request = request(vec![associate.clone()]);
        let mut counts = RoleCounts::new(68);

        // 20-slot shift with one break: two work periods.
        let mut assignment = ShiftAssignment::new("A1", SlotBlock::new(0, 20));
        assignment.breaks = vec![SlotBlock::new(10, 11)];

        assert!(assign_roles(&mut assignment, &associate, &request, &mut counts));
        assert_eq!(assignment.roles.len(), 2);
        assert_eq!(assignment.roles[0].role, assignment.roles[1].role);
    }

    #[test]
    fn test_avoided_constrained_role_skipped_when_picking_open() {
        let associate = Associate::new("A1", "Alice")
            .with_availability(d("2026-08-03"), Availability::new(0, 68))
            .with_allowed_roles([JobRole::GmdSm, JobRole::Picking])
            .with_preference(JobRole::GmdSm, Preference::Avoid);
        let request = request(vec![associate.clone()]);
        let mut counts = RoleCounts::new(68);
        let mut assignment = shift_4h("A1");

        assert!(assign_roles(&mut assignment, &associate, &request, &mut counts));
        assert_eq!(assignment.roles[0].role, JobRole::Picking);
    }
}

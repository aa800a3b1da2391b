//! Suggestion Engine (A4). Grounded on
//! `parent_teacher_conference_sorting_with_suggestions.py::suggest_alternative_timeslots_for_meeting`.

use std::collections::HashSet;
use types::{MeetingOutcome, TimeslotId};

/// For a request `(parent, teacher)` whose current assignment is excluded
/// from both busy sets (so it remains listable as an alternative), returns
/// feasible slots ordered with preferred slots first, then input order.
pub fn suggest_alternative_slots(
    time_slots: &[TimeslotId],
    preferred_slots: &HashSet<&str>,
    teacher: &str,
    parent: &str,
    schedule: &[MeetingOutcome],
) -> Vec<TimeslotId> {
    let teacher_busy: HashSet<&str> = schedule
        .iter()
        .filter(|m| m.teacher.0 == teacher && m.parent.0 != parent)
        .filter_map(|m| m.timeslot.as_ref().map(|t| t.0.as_str()))
        .collect();
    let parent_busy: HashSet<&str> = schedule
        .iter()
        .filter(|m| m.parent.0 == parent && m.teacher.0 != teacher)
        .filter_map(|m| m.timeslot.as_ref().map(|t| t.0.as_str()))
        .collect();

    let mut feasible: Vec<&TimeslotId> = time_slots
        .iter()
        .filter(|s| !teacher_busy.contains(s.0.as_str()) && !parent_busy.contains(s.0.as_str()))
        .collect();

    let order_index: std::collections::HashMap<&str, usize> = time_slots
        .iter()
        .enumerate()
        .map(|(i, s)| (s.0.as_str(), i))
        .collect();
    feasible.sort_by_key(|s| {
        let is_nonpreferred = !preferred_slots.contains(s.0.as_str());
        (is_nonpreferred, order_index[s.0.as_str()])
    });

    feasible.into_iter().cloned().collect()
}

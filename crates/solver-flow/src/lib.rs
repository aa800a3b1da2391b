pub mod aggregator;
pub mod gadget;
pub mod graph;
pub mod mcf;
pub mod suggest;

use async_trait::async_trait;
use sched_core::{AggregatorEngine, ScheduleEngine};
use std::collections::HashSet;
use tracing::{info, warn};
use types::{
    AggregatorEnvelope, MeetingOutcome, ScheduleEnvelope, ScheduleResult, SuggestRequest,
    SuggestResponse,
};

pub struct FlowSolver;

#[async_trait]
impl ScheduleEngine for FlowSolver {
    async fn solve(&self, env: ScheduleEnvelope) -> anyhow::Result<ScheduleResult> {
        let precheck_warnings =
            gadget::precheck_capacity(&env.time_slots, &env.teachers, &env.parent_preferences);
        for w in &precheck_warnings {
            warn!(%w, "scheduling input-shape warning");
        }

        info!(
            requests = env.parent_preferences.iter().map(|p| p.teachers.len()).sum::<usize>(),
            slots = env.time_slots.len(),
            "solving gadget flow network"
        );

        let solution =
            gadget::solve_gadget(&env.time_slots, &env.teachers, &env.parent_preferences, &env.params)?;
        let reward = sched_core::reward::compute_schedule_reward(
            &solution.outcomes,
            solution.drops.len(),
            &env.params,
        );

        let suggestions = if env.with_suggestions {
            Some(build_suggestions(&env, &solution.outcomes))
        } else {
            None
        };

        let mut seen: HashSet<String> = precheck_warnings.iter().cloned().collect();
        let mut warnings = precheck_warnings;
        for w in &solution.warnings {
            if seen.insert(w.clone()) {
                warnings.push(w.clone());
            }
        }

        let stats = serde_json::json!({
            "preferred_count": reward.preferred_count,
            "nonpreferred_count": reward.nonpreferred_count,
            "drop_count": reward.drop_count,
            "warnings": warnings,
            "suggestions": suggestions,
        });

        Ok(ScheduleResult {
            status: "optimal".to_string(),
            total_reward: solution.total_reward,
            assignments: solution.outcomes,
            drops: solution.drops,
            stats,
        })
    }
}

fn build_suggestions(
    env: &ScheduleEnvelope,
    outcomes: &[MeetingOutcome],
) -> std::collections::HashMap<String, Vec<String>> {
    let mut out = std::collections::HashMap::new();
    for o in outcomes {
        if o.timeslot.is_none() || o.preferred {
            continue;
        }
        let Some(pref) = env
            .parent_preferences
            .iter()
            .find(|p| p.parent.0 == o.parent.0)
        else {
            continue;
        };
        let preferred_slots: HashSet<&str> =
            pref.preferred_slots.iter().map(|s| s.0.as_str()).collect();
        let sugg = suggest::suggest_alternative_slots(
            &env.time_slots,
            &preferred_slots,
            o.teacher.0.as_str(),
            o.parent.0.as_str(),
            outcomes,
        );
        out.insert(
            format!("{}:{}", o.parent, o.teacher),
            sugg.into_iter().map(|s| s.0).collect(),
        );
    }
    out
}

pub async fn suggest_single(req: SuggestRequest) -> anyhow::Result<SuggestResponse> {
    let preferred_slots: HashSet<&str> = req
        .preferred_slots
        .iter()
        .map(|s| s.0.as_str())
        .collect();
    let feasible_slots = suggest::suggest_alternative_slots(
        &req.time_slots,
        &preferred_slots,
        req.teacher.0.as_str(),
        req.parent.0.as_str(),
        &req.schedule,
    );
    Ok(SuggestResponse { feasible_slots })
}

pub struct AggregatorSolver;

#[async_trait]
impl AggregatorEngine for AggregatorSolver {
    async fn solve(&self, env: AggregatorEnvelope) -> anyhow::Result<ScheduleResult> {
        info!(
            requests = env.meeting_requests.len(),
            slots = env.global_timeslots.len(),
            "solving aggregator flow network"
        );
        let solution = aggregator::solve_aggregator(
            &env.meeting_requests,
            &env.teacher_slots,
            &env.global_timeslots,
            &env.params,
        )?;

        let stats = serde_json::json!({
            "drop_count": solution.drops.len(),
        });

        Ok(ScheduleResult {
            status: "optimal".to_string(),
            total_reward: solution.total_reward,
            assignments: solution.outcomes,
            drops: solution.drops,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{GadgetParams, ParentPreference, TeacherId, TimeslotId};

    fn slots(labels: &[&str]) -> Vec<TimeslotId> {
        labels.iter().map(|s| TimeslotId(s.to_string())).collect()
    }

    // Scenario S1: 4 slots, 4 teachers, 3 parents each requesting 3 teachers
    // with 2 preferred slots; all 9 meetings scheduled, 6 preferred,
    // total_reward = 60, no drops.
    #[test]
    fn scenario_s1_gadget_feasibility() {
        let time_slots = slots(&["9:00", "9:30", "10:00", "10:30"]);
        let parent_preferences = vec![
            ParentPreference {
                parent: "Parent1".into(),
                teachers: vec![
                    TeacherId::from("Math"),
                    TeacherId::from("Science"),
                    TeacherId::from("English"),
                ],
                preferred_slots: slots(&["9:00", "9:30"]),
            },
            ParentPreference {
                parent: "Parent2".into(),
                teachers: vec![
                    TeacherId::from("Science"),
                    TeacherId::from("History"),
                    TeacherId::from("English"),
                ],
                preferred_slots: slots(&["10:00", "10:30"]),
            },
            ParentPreference {
                parent: "Parent3".into(),
                teachers: vec![
                    TeacherId::from("Math"),
                    TeacherId::from("History"),
                    TeacherId::from("English"),
                ],
                preferred_slots: slots(&["9:30", "10:00"]),
            },
        ];
        let params = GadgetParams {
            preferred_reward: 10,
            drop_penalty: 1000,
        };
        let teachers = vec![
            TeacherId::from("Math"),
            TeacherId::from("Science"),
            TeacherId::from("English"),
            TeacherId::from("History"),
        ];

        let solution =
            crate::gadget::solve_gadget(&time_slots, &teachers, &parent_preferences, &params).unwrap();

        assert_eq!(solution.drops.len(), 0);
        let preferred_count = solution.outcomes.iter().filter(|o| o.preferred).count();
        assert_eq!(preferred_count, 6);
        assert_eq!(solution.total_reward, 60);

        // invariant 1/2: no parent or teacher double-booked
        let mut parent_slot = std::collections::HashSet::new();
        let mut teacher_slot = std::collections::HashSet::new();
        for o in &solution.outcomes {
            let slot = o.timeslot.as_ref().unwrap();
            assert!(parent_slot.insert((o.parent.0.clone(), slot.0.clone())));
            assert!(teacher_slot.insert((o.teacher.0.clone(), slot.0.clone())));
        }
    }

    // Scenario S2: 2 slots, 1 teacher, 3 parents all requesting the same
    // teacher and all preferring the same slot: one scheduled, two dropped.
    #[test]
    fn scenario_s2_gadget_tight() {
        let time_slots = slots(&["9:00", "9:30"]);
        let parent_preferences = vec![
            ParentPreference {
                parent: "Parent1".into(),
                teachers: vec![TeacherId::from("Math")],
                preferred_slots: slots(&["9:00"]),
            },
            ParentPreference {
                parent: "Parent2".into(),
                teachers: vec![TeacherId::from("Math")],
                preferred_slots: slots(&["9:00"]),
            },
            ParentPreference {
                parent: "Parent3".into(),
                teachers: vec![TeacherId::from("Math")],
                preferred_slots: slots(&["9:00"]),
            },
        ];
        let params = GadgetParams {
            preferred_reward: 10,
            drop_penalty: 1000,
        };
        let teachers = vec![TeacherId::from("Math")];

        let solution =
            crate::gadget::solve_gadget(&time_slots, &teachers, &parent_preferences, &params).unwrap();

        assert_eq!(solution.drops.len(), 2);
        assert_eq!(solution.total_reward, 10 - 2 * 1000);
    }

    // Scenario S3 (adapted): 1 parent, 2 teachers, 4 slots. Science is only
    // available at its preferred slot (10:30); Math's teacher is away from
    // Math's own preferred slot (9:00) and only free at 9:30/10:00, which
    // cost the same reschedule penalty either way. The bonus chain is what
    // breaks that tie: carrying the parent's flow unit through the unused
    // 9:00 node collects two bonus hops on the way to 10:00, which is
    // adjacent to Science's meeting, undercutting the single-hop route to
    // 9:30 despite both landing slots costing an identical reschedule fee.
    #[test]
    fn scenario_s3_aggregator_adjacency_bonus_breaks_reschedule_tie() {
        use crate::aggregator::solve_aggregator;
        use types::{AggregatorParams, MeetingRequestRow};

        let global_timeslots = slots(&["9:00", "9:30", "10:00", "10:30"]);
        let teacher_slots: std::collections::HashMap<String, Vec<TimeslotId>> = [
            ("Math".to_string(), slots(&["9:30", "10:00"])),
            ("Science".to_string(), slots(&["10:30"])),
        ]
        .into_iter()
        .collect();
        let meeting_requests = vec![
            MeetingRequestRow {
                parent: "Parent1".into(),
                teacher: TeacherId::from("Math"),
                preferred_slot: TimeslotId("9:00".to_string()),
            },
            MeetingRequestRow {
                parent: "Parent1".into(),
                teacher: TeacherId::from("Science"),
                preferred_slot: TimeslotId("10:30".to_string()),
            },
        ];
        let params = AggregatorParams {
            drop_penalty: 1000,
            reschedule_penalty: 50,
            parent_bonus: 20,
        };

        let solution =
            solve_aggregator(&meeting_requests, &teacher_slots, &global_timeslots, &params)
                .unwrap();

        assert_eq!(solution.drops.len(), 0);
        let math = solution
            .outcomes
            .iter()
            .find(|o| o.teacher.0 == "Math")
            .unwrap();
        assert_eq!(math.timeslot.as_ref().unwrap().0, "10:00");
        assert_eq!(solution.total_reward, -10);
    }

    // Scenario S4: schedule from S1 with one meeting moved off-preference;
    // its suggestion list must contain only slots unoccupied by that parent
    // and that teacher, preferred slots first.
    #[test]
    fn scenario_s4_suggestions_exclude_busy_slots_and_favor_preferred() {
        let time_slots = slots(&["9:00", "9:30", "10:00", "10:30"]);
        // Parent1/Math is off-preference at 10:00; Parent1 is also booked
        // with English at 9:30 and Science at 9:00 is taken by Parent3.
        let schedule = vec![
            types::MeetingOutcome {
                parent: "Parent1".into(),
                teacher: TeacherId::from("Math"),
                timeslot: Some(TimeslotId("10:00".to_string())),
                preferred: false,
            },
            types::MeetingOutcome {
                parent: "Parent1".into(),
                teacher: TeacherId::from("English"),
                timeslot: Some(TimeslotId("9:30".to_string())),
                preferred: true,
            },
            types::MeetingOutcome {
                parent: "Parent3".into(),
                teacher: TeacherId::from("Math"),
                timeslot: Some(TimeslotId("9:00".to_string())),
                preferred: true,
            },
        ];
        let preferred_slots: HashSet<&str> = ["9:00", "9:30"].into_iter().collect();

        let suggestions = suggest::suggest_alternative_slots(
            &time_slots,
            &preferred_slots,
            "Math",
            "Parent1",
            &schedule,
        );

        // 9:00 is taken by another parent's Math meeting, 9:30 is taken by
        // this parent's own English meeting, 10:00 is the current (excluded
        // since it's this parent/teacher's own slot and thus not "busy").
        let labels: Vec<&str> = suggestions.iter().map(|s| s.0.as_str()).collect();
        assert_eq!(labels, vec!["10:00", "10:30"]);
    }

    #[test]
    fn precheck_flags_overloaded_teacher() {
        let time_slots = slots(&["9:00", "9:30"]);
        let parent_preferences = vec![
            ParentPreference {
                parent: "Parent1".into(),
                teachers: vec![TeacherId::from("Math")],
                preferred_slots: slots(&["9:00"]),
            },
            ParentPreference {
                parent: "Parent2".into(),
                teachers: vec![TeacherId::from("Math")],
                preferred_slots: slots(&["9:00"]),
            },
            ParentPreference {
                parent: "Parent3".into(),
                teachers: vec![TeacherId::from("Math")],
                preferred_slots: slots(&["9:00"]),
            },
        ];
        let teachers = vec![TeacherId::from("Math")];
        let warnings = crate::gadget::precheck_capacity(&time_slots, &teachers, &parent_preferences);
        assert!(warnings.iter().any(|w| w.contains("Math")));
    }

    #[test]
    fn precheck_flags_unknown_teacher() {
        let time_slots = slots(&["9:00", "9:30"]);
        let parent_preferences = vec![ParentPreference {
            parent: "Parent1".into(),
            teachers: vec![TeacherId::from("Math"), TeacherId::from("Ghost")],
            preferred_slots: slots(&["9:00"]),
        }];
        let teachers = vec![TeacherId::from("Math")];
        let warnings = crate::gadget::precheck_capacity(&time_slots, &teachers, &parent_preferences);
        assert!(warnings.iter().any(|w| w.contains("unknown teacher Ghost")));
    }

    #[test]
    fn solve_gadget_skips_unknown_teacher() {
        let time_slots = slots(&["9:00", "9:30"]);
        let parent_preferences = vec![ParentPreference {
            parent: "Parent1".into(),
            teachers: vec![TeacherId::from("Math"), TeacherId::from("Ghost")],
            preferred_slots: slots(&["9:00"]),
        }];
        let teachers = vec![TeacherId::from("Math")];
        let params = GadgetParams::default();

        let solution =
            crate::gadget::solve_gadget(&time_slots, &teachers, &parent_preferences, &params).unwrap();

        assert!(solution.warnings.iter().any(|w| w.contains("unknown teacher Ghost")));
        // only the known-teacher request is carried through to outcomes
        assert_eq!(solution.outcomes.len(), 1);
        assert_eq!(solution.outcomes[0].teacher.0, "Math");
    }
}

/// Property tests over randomly generated small instances: regardless of
/// the preference shape, the gadget network must never double-book a
/// parent or a teacher into the same slot twice.
#[cfg(test)]
mod proptest_invariants {
    use crate::gadget;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};
    use types::{GadgetParams, ParentPreference, TeacherId, TimeslotId};

    fn slot(i: usize) -> TimeslotId {
        TimeslotId(format!("slot{i}"))
    }
    fn teacher(i: usize) -> TeacherId {
        TeacherId(format!("teacher{i}"))
    }

    /// A scheduling instance with 1-4 slots, 1-3 teachers, 1-3 parents, each
    /// parent requesting a non-empty subset of teachers and an arbitrary
    /// (possibly empty) subset of slots as preferred.
    fn instance() -> impl Strategy<Value = (Vec<TimeslotId>, Vec<TeacherId>, Vec<ParentPreference>)> {
        (1usize..=4, 1usize..=3).prop_flat_map(|(slot_count, teacher_count)| {
            let time_slots: Vec<TimeslotId> = (0..slot_count).map(slot).collect();
            let roster: Vec<TeacherId> = (0..teacher_count).map(teacher).collect();

            let parent = (
                pvec(0..teacher_count, 1..=teacher_count),
                pvec(0..slot_count, 0..=slot_count),
            )
                .prop_map(move |(teacher_idxs, pref_idxs)| {
                    let teachers: Vec<TeacherId> = teacher_idxs
                        .into_iter()
                        .collect::<HashSet<_>>()
                        .into_iter()
                        .map(teacher)
                        .collect();
                    let preferred_slots: Vec<TimeslotId> = pref_idxs
                        .into_iter()
                        .collect::<HashSet<_>>()
                        .into_iter()
                        .map(slot)
                        .collect();
                    (teachers, preferred_slots)
                });

            (pvec(parent, 1..=3), Just((time_slots, roster))).prop_map(|(parents, (time_slots, roster))| {
                let parent_preferences = parents
                    .into_iter()
                    .enumerate()
                    .map(|(i, (teachers, preferred_slots))| ParentPreference {
                        parent: types::ParentId(format!("parent{i}")),
                        teachers,
                        preferred_slots,
                    })
                    .collect();
                (time_slots, roster, parent_preferences)
            })
        })
    }

    proptest! {
        #[test]
        fn no_double_booking((time_slots, roster, parent_preferences) in instance()) {
            let solution = gadget::solve_gadget(&time_slots, &roster, &parent_preferences, &GadgetParams::default())
                .expect("bounded instances never exceed flow capacity");

            let mut parent_slot_seen: HashSet<(String, String)> = HashSet::new();
            let mut teacher_slot_seen: HashSet<(String, String)> = HashSet::new();
            for outcome in &solution.outcomes {
                if let Some(ts) = &outcome.timeslot {
                    prop_assert!(
                        parent_slot_seen.insert((outcome.parent.0.clone(), ts.0.clone())),
                        "parent {} double-booked at {}", outcome.parent.0, ts.0
                    );
                    prop_assert!(
                        teacher_slot_seen.insert((outcome.teacher.0.clone(), ts.0.clone())),
                        "teacher {} double-booked at {}", outcome.teacher.0, ts.0
                    );
                }
            }

            // every request is accounted for exactly once, either scheduled
            // or dropped
            let requested: usize = parent_preferences.iter().map(|p| p.teachers.len()).sum();
            prop_assert_eq!(solution.outcomes.len(), requested);
            let scheduled = solution.outcomes.iter().filter(|o| o.timeslot.is_some()).count();
            prop_assert_eq!(scheduled + solution.drops.len(), requested);
        }
    }

    /// Same invariant, exercised against the aggregator formulation's
    /// per-(parent, slot) node split, the one the flat gadget network
    /// doesn't share (see `OQ-H2` in DESIGN.md).
    fn aggregator_instance() -> impl Strategy<Value = (Vec<TimeslotId>, Vec<types::MeetingRequestRow>)> {
        (1usize..=4, 1usize..=3, 1usize..=2).prop_flat_map(|(slot_count, parent_count, teacher_count)| {
            let time_slots: Vec<TimeslotId> = (0..slot_count).map(slot).collect();
            let teachers: Vec<TeacherId> = (0..teacher_count).map(teacher).collect();

            let row = (0..parent_count, 0..teacher_count, 0..slot_count);
            (pvec(row, 1..=parent_count * teacher_count), Just((time_slots, teachers)))
                .prop_map(move |(rows, (time_slots, teachers))| {
                    let mut seen_pairs = HashSet::new();
                    let mut meeting_requests = Vec::new();
                    for (p, t, s) in rows {
                        if seen_pairs.insert((p, t)) {
                            meeting_requests.push(types::MeetingRequestRow {
                                parent: types::ParentId(format!("parent{p}")),
                                teacher: teachers[t].clone(),
                                preferred_slot: time_slots[s].clone(),
                            });
                        }
                    }
                    (time_slots, meeting_requests)
                })
        })
    }

    proptest! {
        #[test]
        fn aggregator_no_double_booking((time_slots, meeting_requests) in aggregator_instance()) {
            let teacher_slots: HashMap<String, Vec<TimeslotId>> = meeting_requests
                .iter()
                .map(|r| r.teacher.0.clone())
                .collect::<HashSet<_>>()
                .into_iter()
                .map(|t| (t, time_slots.clone()))
                .collect();

            let solution = crate::aggregator::solve_aggregator(
                &meeting_requests,
                &teacher_slots,
                &time_slots,
                &types::AggregatorParams::default(),
            )
            .expect("every parent has a drop edge, so this is always feasible");

            let mut parent_slot_seen: HashSet<(String, String)> = HashSet::new();
            let mut teacher_slot_seen: HashSet<(String, String)> = HashSet::new();
            for outcome in &solution.outcomes {
                if let Some(ts) = &outcome.timeslot {
                    prop_assert!(
                        parent_slot_seen.insert((outcome.parent.0.clone(), ts.0.clone())),
                        "parent {} double-booked at {}", outcome.parent.0, ts.0
                    );
                    prop_assert!(
                        teacher_slot_seen.insert((outcome.teacher.0.clone(), ts.0.clone())),
                        "teacher {} double-booked at {}", outcome.teacher.0, ts.0
                    );
                }
            }

            let scheduled = solution.outcomes.iter().filter(|o| o.timeslot.is_some()).count();
            prop_assert_eq!(scheduled + solution.drops.len(), meeting_requests.len());
        }
    }
}

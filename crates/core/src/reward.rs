use std::collections::{HashMap, HashSet};
use types::{ClassId, GadgetParams, MeetingOutcome, Student, StudentId};

/// Breakdown of a scheduling result's reward, mirroring TotalReward's
/// definition in the gadget formulation (`preferred_reward · #preferred −
/// drop_penalty · #drops`), used by the solve route to populate `stats`.
#[derive(Clone, Debug, Default)]
pub struct ScheduleReward {
    pub preferred_count: i64,
    pub nonpreferred_count: i64,
    pub drop_count: i64,
    pub total_reward: i64,
}

pub fn compute_schedule_reward(
    outcomes: &[MeetingOutcome],
    drop_count: usize,
    params: &GadgetParams,
) -> ScheduleReward {
    let mut preferred_count = 0i64;
    let mut nonpreferred_count = 0i64;
    for o in outcomes {
        if o.timeslot.is_none() {
            continue;
        }
        if o.preferred {
            preferred_count += 1;
        } else {
            nonpreferred_count += 1;
        }
    }
    let total_reward = params.preferred_reward * preferred_count
        - params.drop_penalty * drop_count as i64;
    ScheduleReward {
        preferred_count,
        nonpreferred_count,
        drop_count: drop_count as i64,
        total_reward,
    }
}

/// Breakdown of a class assignment's objective: per-class sum of
/// `|prefs(s1) ∩ prefs(s2)|` over every pair of classmates, mirroring
/// `solver_ilp::ilp_core::build_objective`'s weight exactly so
/// `ClassResult.stats` never disagrees with `ClassResult.objective`.
#[derive(Clone, Debug, Default)]
pub struct ClassRewardBreakdown {
    pub pairs_satisfied: HashMap<String, i64>,
    pub total_pairs_satisfied: i64,
}

pub fn compute_class_reward(
    students: &[Student],
    assignment: &HashMap<ClassId, Vec<StudentId>>,
) -> ClassRewardBreakdown {
    let prefs: HashMap<&str, HashSet<&str>> = students
        .iter()
        .map(|s| (s.id.0.as_str(), s.preferences.iter().map(|p| p.0.as_str()).collect()))
        .collect();

    let mut pairs_satisfied = HashMap::new();
    let mut total = 0i64;
    for (class, members) in assignment {
        let mut count = 0i64;
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (Some(p1), Some(p2)) =
                    (prefs.get(members[i].0.as_str()), prefs.get(members[j].0.as_str()))
                else {
                    continue;
                };
                count += p1.intersection(p2).count() as i64;
            }
        }
        pairs_satisfied.insert(class.0.clone(), count);
        total += count;
    }
    ClassRewardBreakdown {
        pairs_satisfied,
        total_pairs_satisfied: total,
    }
}

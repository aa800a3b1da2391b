//! Flow-Graph Builder (A1) and Min-Cost Flow Driver (A2): the gadget
//! formulation. Grounded on
//! `parent_teacher_conference_sorting.py::schedule_meetings_optimal`, with
//! stringly node ids replaced by the typed `NodeTable`/`NodeIdx` arena in
//! [`crate::graph`].

use crate::graph::{FlowGraph, NodeTable};
use crate::mcf::{self, FlowError};
use std::collections::{HashMap, HashSet};
use types::{GadgetParams, MeetingOutcome, MeetingRequest, ParentPreference, TeacherId, TimeslotId};

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct MeetingKey(u32, u32);
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct ParentSlotKey(u32, u32);
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct TeacherSlotKey(u32, u32);

/// Result of building and solving the gadget network, holding everything
/// the decoder needs to recover the schedule.
pub struct GadgetSolution {
    pub outcomes: Vec<MeetingOutcome>,
    pub drops: Vec<MeetingRequest>,
    pub total_reward: i64,
    pub warnings: Vec<String>,
}

pub fn solve_gadget(
    time_slots: &[TimeslotId],
    teachers: &[TeacherId],
    parent_preferences: &[ParentPreference],
    params: &GadgetParams,
) -> Result<GadgetSolution, FlowError> {
    let known_teachers: HashSet<&str> = teachers.iter().map(|t| t.0.as_str()).collect();
    let mut warnings = Vec::new();
    for p in parent_preferences {
        for t in &p.teachers {
            if !known_teachers.contains(t.0.as_str()) {
                warnings.push(format!(
                    "parent {} references unknown teacher {}; skipping",
                    p.parent, t
                ));
            }
        }
    }

    let parent_index: HashMap<&str, u32> = parent_preferences
        .iter()
        .enumerate()
        .map(|(i, p)| (p.parent.0.as_str(), i as u32))
        .collect();

    let mut teacher_index: HashMap<&str, u32> = HashMap::new();
    for p in parent_preferences {
        for t in &p.teachers {
            if !known_teachers.contains(t.0.as_str()) {
                continue;
            }
            let next = teacher_index.len() as u32;
            teacher_index.entry(t.0.as_str()).or_insert(next);
        }
    }

    let preferred: Vec<HashSet<&str>> = parent_preferences
        .iter()
        .map(|p| p.preferred_slots.iter().map(|s| s.0.as_str()).collect())
        .collect();

    let requests: Vec<(u32, u32)> = parent_preferences
        .iter()
        .enumerate()
        .flat_map(|(pi, p)| {
            p.teachers.iter().filter_map(move |t| {
                teacher_index.get(t.0.as_str()).map(|&ti| (pi as u32, ti))
            })
        })
        .collect();

    let mut g = FlowGraph::new();
    let source = g.add_node();
    let sink = g.add_node();
    g.add_supply(source, -(requests.len() as i64));
    g.add_supply(sink, requests.len() as i64);

    let mut meeting_nodes: NodeTable<MeetingKey> = NodeTable::new();
    let mut p_in: NodeTable<ParentSlotKey> = NodeTable::new();
    let mut p_out: NodeTable<ParentSlotKey> = NodeTable::new();
    let mut t_in: NodeTable<TeacherSlotKey> = NodeTable::new();
    let mut t_out: NodeTable<TeacherSlotKey> = NodeTable::new();
    let mut p_gadget_wired: HashSet<ParentSlotKey> = HashSet::new();
    let mut t_gadget_wired: HashSet<TeacherSlotKey> = HashSet::new();

    // edge from M(p,t) -> A(p,t,r) per slot, used for decoding later
    let mut candidate_edges: HashMap<(u32, u32), Vec<(usize, crate::graph::EdgeIdx)>> =
        HashMap::new();
    let mut drop_edges: HashMap<(u32, u32), crate::graph::EdgeIdx> = HashMap::new();

    for &(pi, ti) in &requests {
        let m_node = meeting_nodes.get_or_insert(MeetingKey(pi, ti), &mut g);
        g.add_edge(source, m_node, 1, 0);

        let mut candidates = Vec::with_capacity(time_slots.len());
        for (r_idx, r) in time_slots.iter().enumerate() {
            let cost = if preferred[pi as usize].contains(r.0.as_str()) {
                -params.preferred_reward
            } else {
                0
            };
            let a_node = g.add_node();
            let b_node = g.add_node();
            let e = g.add_edge(m_node, a_node, 1, cost);
            candidates.push((r_idx, e));

            let pk = ParentSlotKey(pi, r_idx as u32);
            let pin = p_in.get_or_insert(pk, &mut g);
            g.add_edge(a_node, pin, 1, 0);
            let pout = p_out.get_or_insert(pk, &mut g);
            if p_gadget_wired.insert(pk) {
                g.add_edge(pin, pout, 1, 0);
            }
            g.add_edge(pout, b_node, 1, 0);

            let tk = TeacherSlotKey(ti, r_idx as u32);
            let tin = t_in.get_or_insert(tk, &mut g);
            g.add_edge(b_node, tin, 1, 0);
            let tout = t_out.get_or_insert(tk, &mut g);
            if t_gadget_wired.insert(tk) {
                g.add_edge(tin, tout, 1, 0);
                g.add_edge(tout, sink, 1, 0);
            }
        }
        candidate_edges.insert((pi, ti), candidates);
        let drop = g.add_edge(m_node, sink, 1, params.drop_penalty);
        drop_edges.insert((pi, ti), drop);
    }

    let solution = mcf::solve(&mut g)?;
    let total_reward = -solution.total_cost;

    let parents_by_idx: Vec<&ParentPreference> = parent_preferences.iter().collect();
    let teacher_names: Vec<&str> = {
        let mut v = vec![""; teacher_index.len()];
        for (&name, &idx) in &teacher_index {
            v[idx as usize] = name;
        }
        v
    };

    let mut outcomes = Vec::with_capacity(requests.len());
    let mut drops = Vec::new();
    for &(pi, ti) in &requests {
        let parent = parents_by_idx[pi as usize].parent.clone();
        let teacher = TeacherId(teacher_names[ti as usize].to_string());
        let mut assigned: Option<usize> = None;
        for &(r_idx, e) in &candidate_edges[&(pi, ti)] {
            if g.flow_on(e) > 0 {
                assigned = Some(r_idx);
                break;
            }
        }
        match assigned {
            Some(r_idx) => {
                let slot = time_slots[r_idx].clone();
                let is_pref = preferred[pi as usize].contains(slot.0.as_str());
                outcomes.push(MeetingOutcome {
                    parent,
                    teacher,
                    timeslot: Some(slot),
                    preferred: is_pref,
                });
            }
            None => {
                drops.push(MeetingRequest {
                    parent: parent.clone(),
                    teacher: teacher.clone(),
                });
                outcomes.push(MeetingOutcome {
                    parent,
                    teacher,
                    timeslot: None,
                    preferred: false,
                });
            }
        }
    }

    Ok(GadgetSolution {
        outcomes,
        drops,
        total_reward,
        warnings,
    })
}

/// Compares `Σ_p min(|teachers(p)|, |time_slots|)` against
/// `|teachers| · |time_slots|` and per-teacher request counts against
/// `|time_slots|`, replacing the source's `feasibility_check` (whose loop
/// variable `t` was never bound to a teacher). Also flags any
/// `ParentPreference` naming a teacher outside `teachers` (the roster
/// `solve_gadget` itself will skip), per spec's InputShape handling.
pub fn precheck_capacity(
    time_slots: &[TimeslotId],
    teachers: &[TeacherId],
    parent_preferences: &[ParentPreference],
) -> Vec<String> {
    let mut warnings = Vec::new();
    let slot_count = time_slots.len();
    if slot_count == 0 {
        warnings.push("no time slots supplied".to_string());
        return warnings;
    }

    let known_teachers: HashSet<&str> = teachers.iter().map(|t| t.0.as_str()).collect();
    let mut per_teacher: HashMap<&str, usize> = HashMap::new();
    for p in parent_preferences {
        for t in &p.teachers {
            if !known_teachers.contains(t.0.as_str()) {
                warnings.push(format!(
                    "parent {} references unknown teacher {}; skipping",
                    p.parent, t
                ));
                continue;
            }
            *per_teacher.entry(t.0.as_str()).or_insert(0) += 1;
        }
    }
    for (teacher, count) in &per_teacher {
        if *count > slot_count {
            warnings.push(format!(
                "teacher {teacher} has {count} requests but only {slot_count} slots"
            ));
        }
    }

    let teacher_count = per_teacher.len().max(1);
    let demand: usize = parent_preferences
        .iter()
        .map(|p| {
            p.teachers
                .iter()
                .filter(|t| known_teachers.contains(t.0.as_str()))
                .count()
                .min(slot_count)
        })
        .sum();
    let supply = teacher_count * slot_count;
    if demand > supply {
        warnings.push(format!(
            "aggregate demand {demand} exceeds teacher-slot capacity {supply}; drops are expected"
        ));
    }
    warnings
}

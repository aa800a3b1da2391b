//! Aggregator Builder (A3): the time-indexed bipartite formulation with
//! per-parent supply nodes and linear adjacency-bonus edges. Grounded on
//! spec prose alone (§4.3) — the corresponding Python was not recovered
//! from the corpus (see DESIGN.md) — with the same `NodeTable` arena style
//! as [`crate::gadget`].

use crate::graph::{FlowGraph, NodeTable};
use crate::mcf::{self, FlowError};
use std::collections::{HashMap, HashSet};
use types::{AggregatorParams, MeetingOutcome, MeetingRequest, MeetingRequestRow, TimeslotId};

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct ParentKey(u32);
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct ParentSlotKey(u32, u32);
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct TeacherSlotKey(u32, u32);
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct TeacherKey(u32);

pub struct AggregatorSolution {
    pub outcomes: Vec<MeetingOutcome>,
    pub drops: Vec<MeetingRequest>,
    pub total_reward: i64,
}

pub fn solve_aggregator(
    meeting_requests: &[MeetingRequestRow],
    teacher_slots: &HashMap<String, Vec<TimeslotId>>,
    global_timeslots: &[TimeslotId],
    params: &AggregatorParams,
) -> Result<AggregatorSolution, FlowError> {
    let slot_index: HashMap<&str, u32> = global_timeslots
        .iter()
        .enumerate()
        .map(|(i, s)| (s.0.as_str(), i as u32))
        .collect();

    let mut parent_index: HashMap<&str, u32> = HashMap::new();
    let mut teacher_index: HashMap<&str, u32> = HashMap::new();
    for row in meeting_requests {
        let np = parent_index.len() as u32;
        parent_index.entry(row.parent.0.as_str()).or_insert(np);
        let nt = teacher_index.len() as u32;
        teacher_index.entry(row.teacher.0.as_str()).or_insert(nt);
    }

    let mut supply_per_parent: HashMap<u32, i64> = HashMap::new();
    let mut requests_per_teacher: HashMap<u32, i64> = HashMap::new();
    for row in meeting_requests {
        let pi = parent_index[row.parent.0.as_str()];
        let ti = teacher_index[row.teacher.0.as_str()];
        *supply_per_parent.entry(pi).or_insert(0) += 1;
        *requests_per_teacher.entry(ti).or_insert(0) += 1;
    }

    let available: HashMap<u32, HashSet<u32>> = teacher_index
        .iter()
        .map(|(&name, &ti)| {
            let slots = teacher_slots
                .get(name)
                .map(|v| {
                    v.iter()
                        .filter_map(|s| slot_index.get(s.0.as_str()).copied())
                        .collect::<HashSet<u32>>()
                })
                .unwrap_or_default();
            (ti, slots)
        })
        .collect();

    let total_requests: i64 = meeting_requests.len() as i64;

    let mut g = FlowGraph::new();
    let source = g.add_node();
    let sink = g.add_node();
    g.add_supply(source, -total_requests);
    g.add_supply(sink, total_requests);

    let mut a_nodes: NodeTable<ParentKey> = NodeTable::new();
    let mut p_in_nodes: NodeTable<ParentSlotKey> = NodeTable::new();
    let mut p_out_nodes: NodeTable<ParentSlotKey> = NodeTable::new();
    let mut t_nodes: NodeTable<TeacherSlotKey> = NodeTable::new();
    let mut b_nodes: NodeTable<TeacherKey> = NodeTable::new();

    for (&pi, &supply) in &supply_per_parent {
        let a = a_nodes.get_or_insert(ParentKey(pi), &mut g);
        g.add_edge(source, a, supply, 0);
        g.add_edge(a, sink, supply, params.drop_penalty);

        let mut prev_out = None;
        for r in 0..global_timeslots.len() as u32 {
            let key = ParentSlotKey(pi, r);
            let p_in = p_in_nodes.get_or_insert(key, &mut g);
            let p_out = p_out_nodes.get_or_insert(key, &mut g);
            g.add_edge(a, p_in, 1, 0);
            // the sole edge between a slot's in/out half-nodes caps total
            // parent throughput at that slot to one meeting, whether it
            // terminates here or carries on down the bonus chain
            g.add_edge(p_in, p_out, 1, 0);
            if let Some(prev) = prev_out {
                g.add_edge(prev, p_in, 1, -params.parent_bonus);
            }
            prev_out = Some(p_out);
        }
    }

    for (&ti, &count) in &requests_per_teacher {
        let b = b_nodes.get_or_insert(TeacherKey(ti), &mut g);
        g.add_edge(b, sink, count, 0);
        if let Some(slots) = available.get(&ti) {
            for &r in slots {
                let t = t_nodes.get_or_insert(TeacherSlotKey(ti, r), &mut g);
                g.add_edge(t, b, 1, 0);
            }
        }
    }

    let mut candidate_edges: HashMap<(u32, u32), Vec<(u32, crate::graph::EdgeIdx)>> =
        HashMap::new();
    for row in meeting_requests {
        let pi = parent_index[row.parent.0.as_str()];
        let ti = teacher_index[row.teacher.0.as_str()];
        let key = (pi, ti);
        if candidate_edges.contains_key(&key) {
            continue;
        }
        let pref_idx = slot_index.get(row.preferred_slot.0.as_str()).copied();
        let empty = HashSet::new();
        let slots = available.get(&ti).unwrap_or(&empty);
        let mut edges = Vec::new();
        for &r in slots {
            let p = p_out_nodes.get_or_insert(ParentSlotKey(pi, r), &mut g);
            let t = t_nodes.get_or_insert(TeacherSlotKey(ti, r), &mut g);
            let cost = if Some(r) == pref_idx {
                0
            } else {
                params.reschedule_penalty
            };
            let e = g.add_edge(p, t, 1, cost);
            edges.push((r, e));
        }
        candidate_edges.insert(key, edges);
    }

    let solution = mcf::solve(&mut g)?;
    let total_reward = -solution.total_cost;

    let mut outcomes = Vec::with_capacity(meeting_requests.len());
    let mut drops = Vec::new();
    let mut decoded: HashSet<(u32, u32)> = HashSet::new();
    for row in meeting_requests {
        let pi = parent_index[row.parent.0.as_str()];
        let ti = teacher_index[row.teacher.0.as_str()];
        if !decoded.insert((pi, ti)) {
            continue;
        }
        let mut assigned: Option<u32> = None;
        if let Some(edges) = candidate_edges.get(&(pi, ti)) {
            let mut ordered = edges.clone();
            ordered.sort_by_key(|&(r, _)| r);
            for (r, e) in ordered {
                if g.flow_on(e) > 0 {
                    assigned = Some(r);
                    break;
                }
            }
        }
        match assigned {
            Some(r) => {
                let slot = global_timeslots[r as usize].clone();
                let preferred = slot.0 == row.preferred_slot.0;
                outcomes.push(MeetingOutcome {
                    parent: row.parent.clone(),
                    teacher: row.teacher.clone(),
                    timeslot: Some(slot),
                    preferred,
                });
            }
            None => {
                drops.push(MeetingRequest {
                    parent: row.parent.clone(),
                    teacher: row.teacher.clone(),
                });
                outcomes.push(MeetingOutcome {
                    parent: row.parent.clone(),
                    teacher: row.teacher.clone(),
                    timeslot: None,
                    preferred: false,
                });
            }
        }
    }

    Ok(AggregatorSolution {
        outcomes,
        drops,
        total_reward,
    })
}

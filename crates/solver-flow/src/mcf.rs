//! Successive shortest augmenting paths min-cost flow, over integer
//! capacities and costs, with node supplies/demands rather than a single
//! source/sink pair baked into the algorithm (the gadget and aggregator
//! builders both attach their own source/sink nodes and rely on this
//! solver to route every unit of declared supply to declared demand).

use crate::graph::{EdgeIdx, FlowGraph, NodeIdx};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow problem is infeasible: {0} units of supply could not reach a sink")]
    Infeasible(i64),
}

pub struct FlowSolution {
    pub total_cost: i64,
}

/// Runs successive shortest augmenting paths from every net-supply node to
/// every net-demand node, using Bellman-Ford once to seed node potentials
/// (costs may be negative, e.g. preferred-slot rewards) and Dijkstra with
/// reduced costs on every subsequent augmentation — the standard approach
/// for graphs with negative edge costs but no negative cycles.
pub fn solve(g: &mut FlowGraph) -> Result<FlowSolution, FlowError> {
    let n = g.node_count();
    let mut potential = bellman_ford(g)?;

    let mut excess: Vec<i64> = g.supply.clone();
    let mut total_cost = 0i64;

    loop {
        let sources: Vec<NodeIdx> = (0..n)
            .filter(|&i| excess[i] > 0)
            .map(|i| NodeIdx(i as u32))
            .collect();
        if sources.is_empty() {
            break;
        }

        let mut augmented_any = false;
        for s in sources {
            if excess[s.0 as usize] <= 0 {
                continue;
            }
            let (dist, prev_edge) = dijkstra(g, s, &potential);
            // prefer the nearest reachable sink with remaining demand
            let target = (0..n)
                .filter(|&i| excess[i] < 0 && dist[i] < i64::MAX)
                .min_by_key(|&i| dist[i]);
            let Some(t) = target else { continue };

            for i in 0..n {
                if dist[i] < i64::MAX {
                    potential[i] += dist[i];
                }
            }

            let mut path_capacity = excess[s.0 as usize].min(-excess[t]);
            let mut cur = t;
            let mut path: Vec<EdgeIdx> = Vec::new();
            while cur != s.0 as usize {
                let e = prev_edge[cur].expect("path reconstructed from dijkstra predecessor");
                path_capacity = path_capacity.min(g.residual(e));
                path.push(e);
                cur = predecessor_node(g, e);
            }
            if path_capacity <= 0 {
                continue;
            }
            for &e in &path {
                g.push_flow(e, path_capacity);
                total_cost += g.cost(e) * path_capacity;
            }
            excess[s.0 as usize] -= path_capacity;
            excess[t] += path_capacity;
            augmented_any = true;
        }
        if !augmented_any {
            break;
        }
    }

    let unmet: i64 = excess.iter().filter(|&&x| x > 0).sum();
    if unmet > 0 {
        return Err(FlowError::Infeasible(unmet));
    }

    Ok(FlowSolution { total_cost })
}

fn predecessor_node(g: &FlowGraph, e: EdgeIdx) -> usize {
    // the reverse edge of `e` points back at the node `e` was taken from
    g.to(EdgeIdx(e.0 ^ 1)).0 as usize
}

fn bellman_ford(g: &FlowGraph) -> Result<Vec<i64>, FlowError> {
    let n = g.node_count();
    let mut dist = vec![0i64; n];
    for _ in 0..n {
        let mut changed = false;
        for u in 0..n {
            if dist[u] == i64::MAX {
                continue;
            }
            for &e in g.out_edges(NodeIdx(u as u32)) {
                if g.residual(e) <= 0 {
                    continue;
                }
                let v = g.to(e).0 as usize;
                let nd = dist[u] + g.cost(e);
                if nd < dist[v] {
                    dist[v] = nd;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    Ok(dist)
}

fn dijkstra(
    g: &FlowGraph,
    start: NodeIdx,
    potential: &[i64],
) -> (Vec<i64>, Vec<Option<EdgeIdx>>) {
    let n = g.node_count();
    let mut dist = vec![i64::MAX; n];
    let mut prev_edge: Vec<Option<EdgeIdx>> = vec![None; n];
    dist[start.0 as usize] = 0;
    let mut heap: BinaryHeap<Reverse<(i64, usize)>> = BinaryHeap::new();
    heap.push(Reverse((0, start.0 as usize)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if d > dist[u] {
            continue;
        }
        for &e in g.out_edges(NodeIdx(u as u32)) {
            if g.residual(e) <= 0 {
                continue;
            }
            let v = g.to(e).0 as usize;
            let reduced = g.cost(e) + potential[u] - potential[v];
            let nd = d + reduced;
            if nd < dist[v] {
                dist[v] = nd;
                prev_edge[v] = Some(e);
                heap.push(Reverse((nd, v)));
            }
        }
    }

    (dist, prev_edge)
}

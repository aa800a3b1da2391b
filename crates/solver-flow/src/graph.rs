//! Arena-backed min-cost flow graph.
//!
//! Replaces the stringly-named node ids of the source formulation
//! (`"M_<p>_<t>"`, `"P_<p>_<r>_in"`) with integer indices keyed by typed
//! gadget records, built once per graph rather than re-derived from string
//! concatenation at every lookup.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeIdx(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EdgeIdx(pub u32);

#[derive(Clone, Debug)]
struct Edge {
    to: NodeIdx,
    capacity: i64,
    cost: i64,
    flow: i64,
}

/// A directed graph with per-node supply/demand and per-edge (capacity,
/// cost), stored as a forward-star adjacency list with paired residual
/// edges (even index = forward, odd index = its reverse).
pub struct FlowGraph {
    edges: Vec<Edge>,
    adj: Vec<Vec<EdgeIdx>>,
    pub supply: Vec<i64>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            adj: Vec::new(),
            supply: Vec::new(),
        }
    }

    pub fn add_node(&mut self) -> NodeIdx {
        self.adj.push(Vec::new());
        self.supply.push(0);
        NodeIdx((self.adj.len() - 1) as u32)
    }

    pub fn add_supply(&mut self, node: NodeIdx, amount: i64) {
        self.supply[node.0 as usize] += amount;
    }

    /// Adds a directed edge `from -> to` with the given capacity and cost,
    /// plus its zero-capacity residual counterpart.
    pub fn add_edge(&mut self, from: NodeIdx, to: NodeIdx, capacity: i64, cost: i64) -> EdgeIdx {
        let fwd = EdgeIdx(self.edges.len() as u32);
        self.edges.push(Edge {
            to,
            capacity,
            cost,
            flow: 0,
        });
        let rev = EdgeIdx(self.edges.len() as u32);
        self.edges.push(Edge {
            to: from,
            capacity: 0,
            cost: -cost,
            flow: 0,
        });
        self.adj[from.0 as usize].push(fwd);
        self.adj[to.0 as usize].push(rev);
        fwd
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    pub fn residual(&self, e: EdgeIdx) -> i64 {
        let edge = &self.edges[e.0 as usize];
        edge.capacity - edge.flow
    }

    pub fn cost(&self, e: EdgeIdx) -> i64 {
        self.edges[e.0 as usize].cost
    }

    pub fn to(&self, e: EdgeIdx) -> NodeIdx {
        self.edges[e.0 as usize].to
    }

    pub fn out_edges(&self, n: NodeIdx) -> &[EdgeIdx] {
        &self.adj[n.0 as usize]
    }

    pub fn flow_on(&self, e: EdgeIdx) -> i64 {
        self.edges[e.0 as usize].flow
    }

    pub(crate) fn push_flow(&mut self, e: EdgeIdx, amount: i64) {
        self.edges[e.0 as usize].flow += amount;
        let rev = EdgeIdx(e.0 ^ 1);
        self.edges[rev.0 as usize].flow -= amount;
    }

    /// All edges leaving `from`, as `(edge, residual-capacity)` pairs, used
    /// by decoders that scan candidate edges in a fixed external order
    /// rather than adjacency order.
    pub fn find_edge(&self, from: NodeIdx, to: NodeIdx) -> Option<EdgeIdx> {
        self.adj[from.0 as usize]
            .iter()
            .copied()
            .find(|&e| self.to(e) == to && self.edges[e.0 as usize].capacity > 0)
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// A tracked set of created gadget nodes, keyed by a typed record, so the
/// builder never needs an "if node not in graph" string check.
pub struct NodeTable<K: std::hash::Hash + Eq + Clone> {
    map: HashMap<K, NodeIdx>,
}

impl<K: std::hash::Hash + Eq + Clone> NodeTable<K> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn get_or_insert(&mut self, key: K, graph: &mut FlowGraph) -> NodeIdx {
        if let Some(&idx) = self.map.get(&key) {
            return idx;
        }
        let idx = graph.add_node();
        self.map.insert(key, idx);
        idx
    }
}

impl<K: std::hash::Hash + Eq + Clone> Default for NodeTable<K> {
    fn default() -> Self {
        Self::new()
    }
}


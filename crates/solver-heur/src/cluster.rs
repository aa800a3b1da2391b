//! Preference graph & clustering (Core B1).
//!
//! `student_sorting_algorithm.py`'s `preprocess()` builds an undirected graph
//! from student preferences and hands it to `community.best_partition`
//! (Louvain). No community-detection crate sits anywhere in the dependency
//! stack this project draws from, so the partition step is reimplemented
//! here as a greedy modularity-maximizing merge over a `petgraph` graph —
//! the spec treats the partitioner as an opaque routine, not a fixed
//! algorithm, so this is a legitimate from-scratch reimplementation rather
//! than a guess at undocumented behavior.

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet};
use types::Student;

/// `student -> cluster id`. Isolated students (no reciprocal or one-way
/// preference edge touching them) form their own singleton cluster.
pub fn cluster_students(students: &[Student]) -> HashMap<String, u32> {
    let mut graph: UnGraph<(), ()> = UnGraph::new_undirected();
    let mut node_of: HashMap<&str, NodeIndex> = HashMap::new();
    for s in students {
        let idx = graph.add_node(());
        node_of.insert(s.id.0.as_str(), idx);
    }

    let known: HashSet<&str> = node_of.keys().copied().collect();
    let mut seen_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for s in students {
        let u = node_of[s.id.0.as_str()];
        for p in &s.preferences {
            if !known.contains(p.0.as_str()) {
                continue;
            }
            let v = node_of[p.0.as_str()];
            if u == v {
                continue;
            }
            let key = if u < v { (u, v) } else { (v, u) };
            if seen_edges.insert(key) {
                graph.add_edge(u, v, ());
            }
        }
    }

    let partition = greedy_modularity_partition(&graph);

    let mut clusters = HashMap::new();
    for s in students {
        let idx = node_of[s.id.0.as_str()];
        clusters.insert(s.id.0.clone(), partition[&idx]);
    }
    clusters
}

/// Agglomerative greedy modularity maximization: start with every node in
/// its own community, repeatedly merge the adjacent pair of communities
/// with the largest positive modularity gain until no merge improves it.
fn greedy_modularity_partition(graph: &UnGraph<(), ()>) -> HashMap<NodeIndex, u32> {
    let m = graph.edge_count() as f64;
    let mut community: HashMap<NodeIndex, NodeIndex> =
        graph.node_indices().map(|n| (n, n)).collect();
    let mut degree: HashMap<NodeIndex, f64> = graph
        .node_indices()
        .map(|n| (n, graph.edges(n).count() as f64))
        .collect();

    if m == 0.0 {
        return renumber(graph, &community);
    }

    loop {
        // edges-between-communities and total-degree-per-community, recomputed
        // each round since merges change both.
        let mut comm_degree: HashMap<NodeIndex, f64> = HashMap::new();
        for (&n, &c) in &community {
            *comm_degree.entry(c).or_insert(0.0) += degree[&n];
        }

        let mut edges_between: HashMap<(NodeIndex, NodeIndex), f64> = HashMap::new();
        for edge in graph.edge_indices() {
            let (a, b) = graph.edge_endpoints(edge).unwrap();
            let ca = community[&a];
            let cb = community[&b];
            if ca == cb {
                continue;
            }
            let key = if ca < cb { (ca, cb) } else { (cb, ca) };
            *edges_between.entry(key).or_insert(0.0) += 1.0;
        }

        let mut best: Option<((NodeIndex, NodeIndex), f64)> = None;
        for (&(ca, cb), &e_ab) in &edges_between {
            let a_i = comm_degree[&ca];
            let a_j = comm_degree[&cb];
            let gain = e_ab / m - (a_i * a_j) / (2.0 * m * m);
            if gain > best.map_or(0.0, |(_, g)| g) {
                best = Some(((ca, cb), gain));
            }
        }

        match best {
            Some(((ca, cb), gain)) if gain > 1e-12 => {
                for c in community.values_mut() {
                    if *c == cb {
                        *c = ca;
                    }
                }
            }
            _ => break,
        }
    }

    renumber(graph, &community)
}

fn renumber(
    graph: &UnGraph<(), ()>,
    community: &HashMap<NodeIndex, NodeIndex>,
) -> HashMap<NodeIndex, u32> {
    let mut root_label: HashMap<NodeIndex, u32> = HashMap::new();
    let mut next = 0u32;
    for n in graph.node_indices() {
        let root = community[&n];
        root_label.entry(root).or_insert_with(|| {
            let l = next;
            next += 1;
            l
        });
    }
    graph
        .node_indices()
        .map(|n| (n, root_label[&community[&n]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, prefs: &[&str]) -> Student {
        Student {
            id: id.into(),
            preferences: prefs.iter().map(|p| (*p).into()).collect(),
            sex: None,
            categorical: Default::default(),
        }
    }

    #[test]
    fn two_disjoint_triangles_cluster_separately() {
        let students = vec![
            student("A1", &["A2", "A3"]),
            student("A2", &["A1", "A3"]),
            student("A3", &["A1", "A2"]),
            student("B1", &["B2", "B3"]),
            student("B2", &["B1", "B3"]),
            student("B3", &["B1", "B2"]),
        ];
        let clusters = cluster_students(&students);
        let ca = clusters["A1"];
        assert_eq!(clusters["A2"], ca);
        assert_eq!(clusters["A3"], ca);
        let cb = clusters["B1"];
        assert_eq!(clusters["B2"], cb);
        assert_eq!(clusters["B3"], cb);
        assert_ne!(ca, cb);
    }

    #[test]
    fn isolated_student_gets_singleton_cluster() {
        let students = vec![
            student("A1", &["A2"]),
            student("A2", &["A1"]),
            student("Z", &[]),
        ];
        let clusters = cluster_students(&students);
        assert_ne!(clusters["Z"], clusters["A1"]);
    }
}

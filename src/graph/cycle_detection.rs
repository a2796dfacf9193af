use crate::core::account::AccountId;
use crate::graph::transaction_graph::TransactionGraph;
use std::collections::HashSet;

/// Minimum cycle length considered a laundering loop.
pub const MIN_CYCLE_LEN: usize = 3;
/// Maximum cycle length; bounds the DFS depth.
pub const MAX_CYCLE_LEN: usize = 5;

/// A simple directed cycle, stored in traversal order starting at the
/// node it was discovered from.
pub type Cycle = Vec<AccountId>;

/// Find all simple directed cycles of length 3..=5.
///
/// From each node in insertion order, a depth-bounded DFS walks outgoing
/// edges; a path closing back to its start with 3 to 5 nodes is a
/// candidate. Candidates are deduplicated by their sorted node-set
/// signature, so two traversals of the same loop collapse to one entry
/// and the first discovery is the retained representative. Both the
/// starting-node loop and the neighbor loop follow insertion order,
/// which fixes the representative deterministically.
///
/// The depth-5 bound keeps the search tractable: each expansion checks
/// path membership, so the worst case is `O(V · branching^5)`.
pub fn find_cycles(graph: &TransactionGraph) -> Vec<Cycle> {
    let mut cycles = Vec::new();
    let mut seen: HashSet<Vec<AccountId>> = HashSet::new();

    for start in graph.nodes() {
        let mut path: Vec<AccountId> = Vec::with_capacity(MAX_CYCLE_LEN);
        let mut on_path: HashSet<AccountId> = HashSet::new();
        dfs_collect(start, start, graph, &mut path, &mut on_path, &mut seen, &mut cycles);
    }

    cycles
}

fn dfs_collect(
    current: &AccountId,
    start: &AccountId,
    graph: &TransactionGraph,
    path: &mut Vec<AccountId>,
    on_path: &mut HashSet<AccountId>,
    seen: &mut HashSet<Vec<AccountId>>,
    cycles: &mut Vec<Cycle>,
) {
    path.push(current.clone());
    on_path.insert(current.clone());

    for next in graph.neighbors_out(current) {
        if next == start {
            if path.len() >= MIN_CYCLE_LEN && seen.insert(signature(path)) {
                cycles.push(path.clone());
            }
        } else if path.len() < MAX_CYCLE_LEN && !on_path.contains(next) {
            dfs_collect(next, start, graph, path, on_path, seen, cycles);
        }
    }

    path.pop();
    on_path.remove(current);
}

/// Sorted node-set signature used for deduplication.
fn signature(path: &[AccountId]) -> Vec<AccountId> {
    let mut sig = path.to_vec();
    sig.sort();
    sig
}

/// All accounts participating in at least one cycle.
pub fn cycle_member_set(cycles: &[Cycle]) -> HashSet<AccountId> {
    cycles.iter().flatten().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Transaction, TransactionBatch};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn graph_of(edges: &[(&str, &str)]) -> TransactionGraph {
        let mut batch = TransactionBatch::new();
        for (i, (from, to)) in edges.iter().enumerate() {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(*from),
                AccountId::new(*to),
                dec!(100),
                Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
            ));
        }
        TransactionGraph::from_batch(batch)
    }

    #[test]
    fn test_triangle_found_once() {
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0],
            vec![AccountId::new("A"), AccountId::new("B"), AccountId::new("C")]
        );
    }

    #[test]
    fn test_two_cycle_ignored() {
        let graph = graph_of(&[("A", "B"), ("B", "A")]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn test_self_loop_ignored() {
        let graph = graph_of(&[("A", "A"), ("A", "B"), ("B", "C"), ("C", "A")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
    }

    #[test]
    fn test_depth_bound_excludes_long_cycles() {
        // A six-node loop is beyond the depth bound.
        let graph = graph_of(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "D"),
            ("D", "E"),
            ("E", "F"),
            ("F", "A"),
        ]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn test_five_node_cycle_found() {
        let graph = graph_of(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "D"),
            ("D", "E"),
            ("E", "A"),
        ]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 5);
    }

    #[test]
    fn test_overlapping_cycles_distinct_node_sets() {
        let graph = graph_of(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("B", "D"),
            ("D", "A"),
        ]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 2);

        let sets: Vec<HashSet<&str>> = cycles
            .iter()
            .map(|c| c.iter().map(|id| id.as_str()).collect())
            .collect();
        assert!(sets.contains(&HashSet::from(["A", "B", "C"])));
        assert!(sets.contains(&HashSet::from(["A", "B", "D"])));
    }

    #[test]
    fn test_representative_starts_at_first_seen_node() {
        // C enters the input first, so the retained orientation starts
        // at C even though the loop could be walked from A or B.
        let graph = graph_of(&[("C", "A"), ("A", "B"), ("B", "C")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0][0], AccountId::new("C"));
    }

    #[test]
    fn test_member_set() {
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("C", "A"), ("X", "Y")]);
        let cycles = find_cycles(&graph);
        let members = cycle_member_set(&cycles);
        assert_eq!(members.len(), 3);
        assert!(!members.contains(&AccountId::new("X")));
    }
}

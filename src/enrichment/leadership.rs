use crate::core::account::{AccountIndex, RingRole};
use crate::core::ring::Ring;
use crate::graph::transaction_graph::TransactionGraph;
use std::collections::VecDeque;

/// Score bonus for the account steering a ring.
pub const ORCHESTRATOR_BONUS: u32 = 10;
/// Share of the ranked members (beyond the orchestrator) treated as
/// intermediaries in rings larger than three.
pub const INTERMEDIARY_SHARE: f64 = 0.66;
/// Floor applied when normalising by the maximum centrality.
pub const NORMALISATION_FLOOR: f64 = 1e-9;

pub const LABEL_LEADERSHIP: &str = "Ring Leadership (Betweenness Centrality)";

/// Enrichment pass 3: rank ring members by betweenness centrality and
/// assign roles.
///
/// For every ring with at least two members, the ring-local directed
/// edge set is the distinct hops observed in transactions among members.
/// Brandes' unweighted-directed algorithm yields raw centralities, which
/// are normalised by the maximum (floored at 1e-9, so an all-zero ring
/// keeps member order and its first member ranks on top). Rank 0 is the
/// orchestrator and gains a capped +10; in rings of three or fewer
/// everyone else is peripheral, otherwise the upper two thirds of the
/// remaining ranks are intermediaries. An account orchestrating several
/// rings keeps its highest centrality, and a stronger role is never
/// downgraded by a later ring.
pub fn assign_ring_roles(rings: &[Ring], index: &mut AccountIndex, graph: &TransactionGraph) {
    for ring in rings {
        if ring.members.len() < 2 {
            continue;
        }

        let adjacency = ring_local_adjacency(ring, graph);
        let centrality = brandes_betweenness(&adjacency);

        let max = centrality.iter().cloned().fold(0.0f64, f64::max);
        let denominator = max.max(NORMALISATION_FLOOR);
        let normalised: Vec<f64> = centrality.iter().map(|c| c / denominator).collect();

        // Stable sort keeps member order for equal centralities.
        let mut ranked: Vec<usize> = (0..ring.members.len()).collect();
        ranked.sort_by(|&a, &b| {
            normalised[b]
                .partial_cmp(&normalised[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let intermediary_cutoff = if ring.members.len() <= 3 {
            1
        } else {
            (ring.members.len() as f64 * INTERMEDIARY_SHARE).ceil() as usize
        };

        for (rank, &slot) in ranked.iter().enumerate() {
            let member = &ring.members[slot];
            let Some(record) = index.get_mut(member) else {
                debug_assert!(false, "ring member missing from index");
                continue;
            };

            if record.centrality_score < normalised[slot] {
                record.centrality_score = normalised[slot];
            }

            if rank == 0 {
                record.upgrade_role(RingRole::Orchestrator);
                record.boost_score(ORCHESTRATOR_BONUS);
                record.add_algorithm(LABEL_LEADERSHIP);
                record.explain(format!("Identified as orchestrator of {}", ring.ring_id));
            } else if rank < intermediary_cutoff {
                record.upgrade_role(RingRole::Intermediary);
            } else {
                record.upgrade_role(RingRole::Peripheral);
            }
        }
    }
}

/// Distinct directed hops among ring members, as index-slot adjacency.
fn ring_local_adjacency(ring: &Ring, graph: &TransactionGraph) -> Vec<Vec<usize>> {
    let members = &ring.members;
    let mut adjacency = vec![Vec::new(); members.len()];
    for (from_slot, from) in members.iter().enumerate() {
        for (to_slot, to) in members.iter().enumerate() {
            if from_slot != to_slot && graph.has_edge(from, to) {
                adjacency[from_slot].push(to_slot);
            }
        }
    }
    adjacency
}

/// Brandes' algorithm for unweighted directed graphs: forward BFS from
/// every source counting shortest paths, then a backward pass
/// accumulating dependencies.
fn brandes_betweenness(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    let mut centrality = vec![0.0f64; n];

    for source in 0..n {
        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![-1i64; n];

        sigma[source] = 1.0;
        dist[source] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &adjacency[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    centrality
}

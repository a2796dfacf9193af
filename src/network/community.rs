use crate::core::account::{AccountId, AccountIndex, PatternTag};
use crate::core::ring::{PatternType, Ring, RingId};
use crate::graph::transaction_graph::TransactionGraph;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub const LABEL_COMMUNITY: &str = "Mule Community Detection (BFS Components)";

/// Evidence categories a component can present. At least two distinct
/// categories are required before a component becomes a community ring.
pub const MIN_EVIDENCE_CATEGORIES: usize = 2;

/// Stage 9a: find mule communities in the suspicious subgraph and merge
/// overlapping pattern rings into them.
///
/// The suspicious subgraph has a node per account with a positive score
/// and an undirected edge wherever at least one directed transaction
/// edge links two suspicious accounts. Connected components of size two
/// or more are candidates; a component is accepted when it shows at
/// least two of: a cycle member, a fan-in hub, a fan-out hub, a shell
/// node, a bridge node (undirected degree >= 2 inside the component),
/// or edge density (directed edge count >= node count).
///
/// Accepted components become `RING_COMM_###` rings. The pattern rings
/// their members belong to are subsumed: the global ring list keeps
/// them as an audit trail, but on each member the subsumed ids are
/// replaced by the community id. Finally the whole ring list is
/// re-sorted by risk, stable and descending.
pub fn detect_communities(
    rings: &mut Vec<Ring>,
    index: &mut AccountIndex,
    graph: &TransactionGraph,
    fan_in_hubs: &HashSet<AccountId>,
    fan_out_hubs: &HashSet<AccountId>,
    shell_nodes: &HashSet<AccountId>,
) {
    let suspicious: Vec<AccountId> = index
        .iter()
        .filter(|record| record.suspicion_score > 0)
        .map(|record| record.account_id.clone())
        .collect();
    let suspicious_set: HashSet<AccountId> = suspicious.iter().cloned().collect();

    let cycle_members: HashSet<AccountId> = rings
        .iter()
        .filter(|ring| ring.pattern_type == PatternType::Cycle)
        .flat_map(|ring| ring.members.iter().cloned())
        .collect();

    let adjacency = undirected_adjacency(&suspicious, &suspicious_set, graph);

    let mut next_community = 0usize;
    let mut visited: HashSet<AccountId> = HashSet::new();
    let mut communities: Vec<Ring> = Vec::new();

    for seed in &suspicious {
        if visited.contains(seed) {
            continue;
        }
        let component = bfs_component(seed, &adjacency, &mut visited);
        if component.len() < 2 {
            continue;
        }

        let evidence = evidence_categories(
            &component,
            &adjacency,
            graph,
            &cycle_members,
            fan_in_hubs,
            fan_out_hubs,
            shell_nodes,
        );
        if evidence < MIN_EVIDENCE_CATEGORIES {
            debug!(
                size = component.len(),
                evidence, "component rejected for lack of evidence"
            );
            continue;
        }

        next_community += 1;
        let ring_id = RingId::community(next_community);

        let risk_score = community_risk(&component, index);
        let total_value = component_value(&component, graph);

        // Pattern rings any member belongs to get subsumed on those
        // members; the rings themselves stay in the output.
        let subsumed: Vec<RingId> = component
            .iter()
            .filter_map(|id| index.get(id))
            .flat_map(|record| record.ring_ids.iter().cloned())
            .collect();

        for member in &component {
            if let Some(record) = index.get_mut(member) {
                record.subsume_rings(&subsumed, ring_id.clone());
                record.add_pattern(PatternTag::Community);
                record.add_algorithm(LABEL_COMMUNITY);
                record.explain(format!("Member of mule community {}", ring_id));
            }
        }

        communities.push(Ring::new(
            ring_id,
            PatternType::Community,
            component.clone(),
            risk_score,
            total_value,
            format!("Suspicious community of {} linked accounts", component.len()),
        ));
    }

    rings.extend(communities);
    rings.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
}

/// Undirected adjacency among suspicious accounts, neighbor order
/// following the graph's insertion order (outgoing before incoming).
fn undirected_adjacency(
    suspicious: &[AccountId],
    suspicious_set: &HashSet<AccountId>,
    graph: &TransactionGraph,
) -> HashMap<AccountId, Vec<AccountId>> {
    let mut adjacency: HashMap<AccountId, Vec<AccountId>> = HashMap::new();
    for node in suspicious {
        let mut neighbors: Vec<AccountId> = Vec::new();
        for other in graph
            .neighbors_out(node)
            .iter()
            .chain(graph.neighbors_in(node).iter())
        {
            if other != node
                && suspicious_set.contains(other)
                && !neighbors.contains(other)
            {
                neighbors.push(other.clone());
            }
        }
        adjacency.insert(node.clone(), neighbors);
    }
    adjacency
}

fn bfs_component(
    seed: &AccountId,
    adjacency: &HashMap<AccountId, Vec<AccountId>>,
    visited: &mut HashSet<AccountId>,
) -> Vec<AccountId> {
    let mut component = Vec::new();
    let mut queue = VecDeque::new();
    visited.insert(seed.clone());
    queue.push_back(seed.clone());

    while let Some(node) = queue.pop_front() {
        component.push(node.clone());
        if let Some(neighbors) = adjacency.get(&node) {
            for neighbor in neighbors {
                if visited.insert(neighbor.clone()) {
                    queue.push_back(neighbor.clone());
                }
            }
        }
    }
    component
}

/// Count the distinct evidence categories a component presents.
fn evidence_categories(
    component: &[AccountId],
    adjacency: &HashMap<AccountId, Vec<AccountId>>,
    graph: &TransactionGraph,
    cycle_members: &HashSet<AccountId>,
    fan_in_hubs: &HashSet<AccountId>,
    fan_out_hubs: &HashSet<AccountId>,
    shell_nodes: &HashSet<AccountId>,
) -> usize {
    let members: HashSet<&AccountId> = component.iter().collect();
    let mut categories = 0;

    if component.iter().any(|id| cycle_members.contains(id)) {
        categories += 1;
    }
    if component.iter().any(|id| fan_in_hubs.contains(id)) {
        categories += 1;
    }
    if component.iter().any(|id| fan_out_hubs.contains(id)) {
        categories += 1;
    }
    if component.iter().any(|id| shell_nodes.contains(id)) {
        categories += 1;
    }

    // Bridge nodes: undirected degree of at least two inside the
    // component.
    let has_bridge = component.iter().any(|id| {
        adjacency
            .get(id)
            .map(|neighbors| {
                neighbors
                    .iter()
                    .filter(|n| members.contains(n))
                    .count()
                    >= 2
            })
            .unwrap_or(false)
    });
    if has_bridge {
        categories += 1;
    }

    if directed_edge_count(component, graph) >= component.len() {
        categories += 1;
    }

    categories
}

/// Distinct directed edges with both endpoints in the component.
fn directed_edge_count(component: &[AccountId], graph: &TransactionGraph) -> usize {
    let members: HashSet<&AccountId> = component.iter().collect();
    let mut count = 0;
    for from in component {
        for to in graph.neighbors_out(from) {
            if members.contains(to) {
                count += 1;
            }
        }
    }
    count
}

/// Mean member score plus a logarithmic size bonus, capped at 100.
fn community_risk(component: &[AccountId], index: &AccountIndex) -> u32 {
    let sum: u32 = component
        .iter()
        .filter_map(|id| index.get(id))
        .map(|record| record.suspicion_score)
        .sum();
    let mean = sum as f64 / component.len() as f64;
    let bonus = ((component.len() + 1) as f64).log2() * 10.0;
    (mean + bonus).round().min(100.0) as u32
}

/// Every transaction on directed edges inside the component.
fn component_value(component: &[AccountId], graph: &TransactionGraph) -> Decimal {
    let members: HashSet<&AccountId> = component.iter().collect();
    let mut total = Decimal::ZERO;
    for from in component {
        for to in graph.neighbors_out(from) {
            if members.contains(to) {
                total += graph.edge_total(from, to);
            }
        }
    }
    total
}

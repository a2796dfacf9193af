use crate::core::account::{AccountId, AccountIndex};
use crate::core::ring::{PatternType, Ring, RingId};
use crate::detection::fan_patterns::FanPattern;
use crate::detection::shell_chain::ShellChains;
use crate::graph::cycle_detection::Cycle;
use crate::graph::transaction_graph::TransactionGraph;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Stage 7: materialize ring objects for every detected structure.
///
/// Rings are emitted in a fixed order under one monotonic counter so id
/// assignment is deterministic: cycle rings in enumeration order, then
/// fan-in rings in receiver order, then fan-out rings in sender order,
/// then one shell ring per connected component of the chain union.
/// Member accounts receive the ring id as each ring is created.
pub fn build_rings(
    index: &mut AccountIndex,
    graph: &TransactionGraph,
    cycles: &[Cycle],
    fan_ins: &[FanPattern],
    fan_outs: &[FanPattern],
    shells: &ShellChains,
) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut next_id = 0usize;
    let mut allocate = move || {
        next_id += 1;
        RingId::pattern(next_id)
    };

    for cycle in cycles {
        let total_value = cycle_value(cycle, graph);
        let ring = Ring::new(
            allocate(),
            PatternType::Cycle,
            cycle.clone(),
            mean_suspicion(cycle, index),
            total_value,
            format!("Circular fund flow through {} accounts", cycle.len()),
        );
        attach(index, &ring);
        rings.push(ring);
    }

    for pattern in fan_ins {
        let mut members = vec![pattern.hub.clone()];
        members.extend(pattern.counterparties.iter().cloned());
        let ring = Ring::new(
            allocate(),
            PatternType::FanIn,
            members.clone(),
            mean_suspicion(&members, index),
            Decimal::ZERO,
            format!(
                "{} distinct senders funneled into {} within 72 hours",
                pattern.counterparties.len(),
                pattern.hub
            ),
        );
        attach(index, &ring);
        rings.push(ring);
    }

    for pattern in fan_outs {
        let mut members = vec![pattern.hub.clone()];
        members.extend(pattern.counterparties.iter().cloned());
        let ring = Ring::new(
            allocate(),
            PatternType::FanOut,
            members.clone(),
            mean_suspicion(&members, index),
            Decimal::ZERO,
            format!(
                "{} dispersed funds to {} distinct receivers within 72 hours",
                pattern.hub,
                pattern.counterparties.len()
            ),
        );
        attach(index, &ring);
        rings.push(ring);
    }

    for chain in collapse_chains(&shells.chains) {
        let total_value = path_value(&chain, graph);
        let ring = Ring::new(
            allocate(),
            PatternType::ShellChain,
            chain.clone(),
            mean_suspicion(&chain, index),
            total_value,
            format!(
                "Layered chain through {} low-activity intermediaries",
                chain.len().saturating_sub(2)
            ),
        );
        attach(index, &ring);
        rings.push(ring);
    }

    rings
}

fn attach(index: &mut AccountIndex, ring: &Ring) {
    for member in &ring.members {
        debug_assert!(index.contains(member), "ring member missing from index");
        if let Some(record) = index.get_mut(member) {
            record.add_ring(ring.ring_id.clone());
        }
    }
}

/// Rounded mean of the members' current suspicion scores.
fn mean_suspicion(members: &[AccountId], index: &AccountIndex) -> u32 {
    if members.is_empty() {
        return 0;
    }
    let sum: u32 = members
        .iter()
        .filter_map(|id| index.get(id))
        .map(|record| record.suspicion_score)
        .sum();
    (sum as f64 / members.len() as f64).round() as u32
}

/// Cycle value: the first transaction (input order) on each hop edge.
fn cycle_value(cycle: &[AccountId], graph: &TransactionGraph) -> Decimal {
    let mut total = Decimal::ZERO;
    for i in 0..cycle.len() {
        let from = &cycle[i];
        let to = &cycle[(i + 1) % cycle.len()];
        if let Some(tx) = graph.edge_first(from, to) {
            total += tx.amount();
        }
    }
    total
}

/// Chain value: every transaction on the consecutive hop edges.
fn path_value(chain: &[AccountId], graph: &TransactionGraph) -> Decimal {
    chain
        .windows(2)
        .map(|hop| graph.edge_total(&hop[0], &hop[1]))
        .sum()
}

/// Collapse the raw chain set to one representative per connected
/// component of the chain-union undirected graph: the chain with the
/// most unique nodes, ties broken by first discovery. Components are
/// returned in order of their first chain.
fn collapse_chains(chains: &[Vec<AccountId>]) -> Vec<Vec<AccountId>> {
    if chains.is_empty() {
        return Vec::new();
    }

    let mut sets = DisjointSets::default();
    for chain in chains {
        for pair in chain.windows(2) {
            sets.union(&pair[0], &pair[1]);
        }
    }

    // Group chains by component root, preserving first-appearance order.
    let mut component_order: Vec<AccountId> = Vec::new();
    let mut best_per_component: HashMap<AccountId, &Vec<AccountId>> = HashMap::new();
    for chain in chains {
        let root = sets.find(&chain[0]);
        match best_per_component.get(&root) {
            None => {
                component_order.push(root.clone());
                best_per_component.insert(root, chain);
            }
            Some(best) if chain.len() > best.len() => {
                best_per_component.insert(root, chain);
            }
            Some(_) => {}
        }
    }

    component_order
        .into_iter()
        .filter_map(|root| best_per_component.remove(&root))
        .cloned()
        .collect()
}

/// Minimal union-find over account ids.
#[derive(Default)]
struct DisjointSets {
    parent: HashMap<AccountId, AccountId>,
}

impl DisjointSets {
    fn find(&mut self, id: &AccountId) -> AccountId {
        let parent = self
            .parent
            .entry(id.clone())
            .or_insert_with(|| id.clone())
            .clone();
        if parent == *id {
            return parent;
        }
        let root = self.find(&parent);
        self.parent.insert(id.clone(), root.clone());
        root
    }

    fn union(&mut self, a: &AccountId, b: &AccountId) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            // Attach the later-seen root under the earlier one so the
            // surviving root is stable across runs.
            self.parent.insert(root_b, root_a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Transaction, TransactionBatch};
    use crate::detection::fan_patterns::detect_fan_in;
    use crate::detection::scoring::score_accounts;
    use crate::detection::shell_chain::detect_shell_chains;
    use crate::graph::cycle_detection::find_cycles;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn base() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn graph_of(edges: &[(&str, &str, Decimal)]) -> TransactionGraph {
        let mut batch = TransactionBatch::new();
        for (i, (from, to, amount)) in edges.iter().enumerate() {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(*from),
                AccountId::new(*to),
                *amount,
                base() + Duration::hours(i as i64),
            ));
        }
        TransactionGraph::from_batch(batch)
    }

    #[test]
    fn test_cycle_ring_ids_and_value() {
        let graph = graph_of(&[
            ("A", "B", dec!(5000)),
            ("B", "C", dec!(4800)),
            ("C", "A", dec!(4600)),
            // Second transaction on the A->B edge is not the hop value.
            ("A", "B", dec!(9999)),
        ]);
        let mut index = graph.build_account_index();
        let cycles = find_cycles(&graph);
        score_accounts(
            &mut index,
            &graph,
            &cycles,
            &[],
            &[],
            &ShellChains::default(),
        );

        let rings = build_rings(
            &mut index,
            &graph,
            &cycles,
            &[],
            &[],
            &ShellChains::default(),
        );

        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].ring_id, RingId::pattern(1));
        assert_eq!(rings[0].pattern_type, PatternType::Cycle);
        assert_eq!(rings[0].total_value, dec!(14400));
        assert_eq!(rings[0].risk_score, 40);

        let a = index.get(&AccountId::new("A")).unwrap();
        assert_eq!(a.ring_ids, vec![RingId::pattern(1)]);
    }

    #[test]
    fn test_fixed_emission_order() {
        // A cycle plus a fan-in: the cycle takes RING_001.
        let mut batch = TransactionBatch::new();
        for (i, (from, to)) in [("A", "B"), ("B", "C"), ("C", "A")].iter().enumerate() {
            batch.add(Transaction::new(
                format!("TX-C{}", i),
                AccountId::new(*from),
                AccountId::new(*to),
                dec!(100),
                base() + Duration::hours(i as i64),
            ));
        }
        for i in 0..11 {
            batch.add(Transaction::new(
                format!("TX-F{}", i),
                AccountId::new(format!("S{:02}", i)),
                AccountId::new("R"),
                dec!(500),
                base() + Duration::hours(i),
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();
        let cycles = find_cycles(&graph);
        let fan_ins = detect_fan_in(&graph);
        score_accounts(
            &mut index,
            &graph,
            &cycles,
            &fan_ins,
            &[],
            &ShellChains::default(),
        );

        let rings = build_rings(
            &mut index,
            &graph,
            &cycles,
            &fan_ins,
            &[],
            &ShellChains::default(),
        );

        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].pattern_type, PatternType::Cycle);
        assert_eq!(rings[0].ring_id, RingId::pattern(1));
        assert_eq!(rings[1].pattern_type, PatternType::FanIn);
        assert_eq!(rings[1].ring_id, RingId::pattern(2));
        assert_eq!(rings[1].members[0], AccountId::new("R"));
        assert_eq!(rings[1].total_value, Decimal::ZERO);
    }

    #[test]
    fn test_shell_component_collapsed_to_longest_chain() {
        let graph = graph_of(&[
            ("X", "S1", dec!(1000)),
            ("S1", "S2", dec!(990)),
            ("S2", "S3", dec!(980)),
            ("S3", "Y", dec!(970)),
        ]);
        let mut index = graph.build_account_index();
        let shells = detect_shell_chains(&graph, &index);
        assert!(shells.chains.len() >= 2);

        score_accounts(&mut index, &graph, &[], &[], &[], &shells);
        let rings = build_rings(&mut index, &graph, &[], &[], &[], &shells);

        // One ring for the whole overlapping component, carrying the
        // longest chain.
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].pattern_type, PatternType::ShellChain);
        assert_eq!(rings[0].member_count, 5);
        assert_eq!(rings[0].total_value, dec!(3940));
    }

    #[test]
    fn test_disjoint_shell_components_stay_separate() {
        let graph = graph_of(&[
            ("X", "S1", dec!(100)),
            ("S1", "S2", dec!(100)),
            ("S2", "Y", dec!(100)),
            ("P", "T1", dec!(100)),
            ("T1", "T2", dec!(100)),
            ("T2", "Q", dec!(100)),
        ]);
        let mut index = graph.build_account_index();
        let shells = detect_shell_chains(&graph, &index);
        score_accounts(&mut index, &graph, &[], &[], &[], &shells);

        let rings = build_rings(&mut index, &graph, &[], &[], &[], &shells);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].ring_id, RingId::pattern(1));
        assert_eq!(rings[1].ring_id, RingId::pattern(2));
    }
}

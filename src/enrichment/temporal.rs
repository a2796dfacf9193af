use crate::core::account::{AccountIndex, PatternTag};
use crate::core::ring::{PatternType, Ring, RingId};
use crate::graph::transaction_graph::TransactionGraph;
use rust_decimal::Decimal;
use tracing::debug;

/// Enrichment pass 2: remove cycle rings that are temporally impossible.
///
/// For each cycle ring the hop sequence is `(n_i -> n_(i+1) mod k)` and
/// the earliest transaction on each hop edge is the witness. Two rules
/// must hold around the loop:
///
/// - chronological ordering: witness timestamps never decrease;
/// - amount continuity: each hop carries at least half the previous
///   hop's amount.
///
/// A ring failing either rule is removed. Members left without any
/// surviving cycle ring lose the cycle contribution: the cycle pattern
/// score is zeroed, the tag dropped, and the suspicion score re-derived
/// from the pattern sum. Cycle members are immune to the earlier
/// relationship reductions, so the re-derivation is exact.
pub fn validate_cycle_rings(
    rings: &mut Vec<Ring>,
    index: &mut AccountIndex,
    graph: &TransactionGraph,
) {
    let invalid: Vec<RingId> = rings
        .iter()
        .filter(|ring| ring.pattern_type == PatternType::Cycle && !cycle_is_consistent(ring, graph))
        .map(|ring| ring.ring_id.clone())
        .collect();

    if invalid.is_empty() {
        return;
    }
    debug!(removed = invalid.len(), "temporal validation removed cycle rings");

    let mut affected = Vec::new();
    rings.retain(|ring| {
        if invalid.contains(&ring.ring_id) {
            affected.extend(ring.members.iter().cloned());
            false
        } else {
            true
        }
    });

    for member in affected {
        let still_in_cycle = rings
            .iter()
            .any(|ring| ring.pattern_type == PatternType::Cycle && ring.contains(&member));

        if let Some(record) = index.get_mut(&member) {
            for ring_id in &invalid {
                record.remove_ring(ring_id);
            }
            if !still_in_cycle && record.pattern_scores.cycle > 0 {
                record.pattern_scores.cycle = 0;
                record.remove_pattern(PatternTag::Cycle);
                record.recompute_from_patterns();
                record.explain("Temporal validation removed an inconsistent cycle");
            }
        }
    }
}

fn cycle_is_consistent(ring: &Ring, graph: &TransactionGraph) -> bool {
    debug_assert!(ring.members.len() >= 3, "cycle ring with fewer than 3 members");

    let k = ring.members.len();
    let mut previous_timestamp = None;
    let mut previous_amount: Option<Decimal> = None;

    for i in 0..k {
        let from = &ring.members[i];
        let to = &ring.members[(i + 1) % k];
        let Some(witness) = graph.edge_earliest(from, to) else {
            // A cycle ring without a transaction on some hop cannot be
            // validated; treat it as inconsistent.
            return false;
        };

        if let Some(prev) = previous_timestamp {
            if witness.timestamp() < prev {
                return false;
            }
        }
        if let Some(prev) = previous_amount {
            if witness.amount() * Decimal::from(2) < prev {
                return false;
            }
        }

        previous_timestamp = Some(witness.timestamp());
        previous_amount = Some(witness.amount());
    }

    true
}

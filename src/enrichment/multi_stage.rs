use crate::core::account::{AccountIndex, LaunderingStage, PatternTag};
use crate::core::ring::{PatternType, Ring};
use crate::graph::transaction_graph::TransactionGraph;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Score bonus for accounts spanning multiple pattern types.
pub const MULTI_STAGE_BONUS: u32 = 20;

pub const LABEL_MULTI_STAGE: &str = "Multi-Stage Flow Analysis";

/// Enrichment pass 4: tag accounts that participate in rings of at
/// least two distinct pattern types.
///
/// Such accounts are moving funds through more than one laundering
/// structure. They receive the MULTI_STAGE classification, a capped
/// +20, and a flow pattern: the distinct pattern types ordered by the
/// earliest transaction connecting the account to any member of a ring
/// of that type.
pub fn tag_multi_stage_flows(rings: &[Ring], index: &mut AccountIndex, graph: &TransactionGraph) {
    if rings.is_empty() {
        return;
    }

    // Account -> rings containing it, in ring order.
    let mut memberships: HashMap<&crate::core::account::AccountId, Vec<&Ring>> = HashMap::new();
    for ring in rings {
        for member in &ring.members {
            memberships.entry(member).or_default().push(ring);
        }
    }

    for record in index.iter_mut() {
        let account = record.account_id.clone();
        let Some(member_rings) = memberships.get(&account) else {
            continue;
        };

        let mut first_contact: Vec<(PatternType, Option<DateTime<Utc>>)> = Vec::new();
        for ring in member_rings {
            if first_contact.iter().all(|(t, _)| *t != ring.pattern_type) {
                first_contact.push((
                    ring.pattern_type,
                    earliest_connection(&account, member_rings, ring.pattern_type, graph),
                ));
            }
        }
        if first_contact.len() < 2 {
            continue;
        }

        // Order by earliest contact; unconnected types sort last and
        // the ring-order scan above breaks ties.
        first_contact.sort_by_key(|&(_, ts)| ts.unwrap_or(DateTime::<Utc>::MAX_UTC));

        record.laundering_stage = Some(LaunderingStage::MultiStage);
        record.flow_pattern = first_contact.into_iter().map(|(t, _)| t).collect();
        record.boost_score(MULTI_STAGE_BONUS);
        record.add_pattern(PatternTag::MultiStage);
        record.add_algorithm(LABEL_MULTI_STAGE);
        record.explain(format!(
            "Participates in {} distinct laundering pattern types",
            record.flow_pattern.len()
        ));
    }
}

/// Earliest transaction (by timestamp, input order on ties) linking the
/// account to any member of any of its rings of the given type.
fn earliest_connection(
    account: &crate::core::account::AccountId,
    member_rings: &[&Ring],
    pattern_type: PatternType,
    graph: &TransactionGraph,
) -> Option<DateTime<Utc>> {
    let mut earliest: Option<DateTime<Utc>> = None;
    for ring in member_rings
        .iter()
        .filter(|r| r.pattern_type == pattern_type)
    {
        for tx in graph.transactions_touching(account) {
            let counterparty = if tx.sender_id() == account {
                tx.receiver_id()
            } else {
                tx.sender_id()
            };
            if ring.members.contains(counterparty)
                && earliest.map(|ts| tx.timestamp() < ts).unwrap_or(true)
            {
                earliest = Some(tx.timestamp());
            }
        }
    }
    earliest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::AccountId;
    use crate::core::ring::RingId;
    use crate::core::transaction::{Transaction, TransactionBatch};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn ring(n: usize, pattern_type: PatternType, members: &[&str]) -> Ring {
        Ring::new(
            RingId::pattern(n),
            pattern_type,
            members.iter().map(|m| AccountId::new(*m)).collect(),
            50,
            Decimal::ZERO,
            String::new(),
        )
    }

    #[test]
    fn test_account_in_two_pattern_types() {
        // R receives from the smurfs first, then cycles with B and C.
        let mut batch = TransactionBatch::new();
        for i in 0..3 {
            batch.add(Transaction::new(
                format!("TX-S{}", i),
                AccountId::new(format!("S{}", i)),
                AccountId::new("R"),
                dec!(900),
                base() + Duration::hours(i),
            ));
        }
        batch.add(Transaction::new(
            "TX-C0",
            AccountId::new("R"),
            AccountId::new("B"),
            dec!(2700),
            base() + Duration::hours(10),
        ));
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();
        index.get_mut(&AccountId::new("R")).unwrap().pattern_scores.fan_in = 30;
        index
            .get_mut(&AccountId::new("R"))
            .unwrap()
            .recompute_from_patterns();

        let rings = vec![
            ring(1, PatternType::Cycle, &["R", "B", "C"]),
            ring(2, PatternType::FanIn, &["R", "S0", "S1", "S2"]),
        ];

        tag_multi_stage_flows(&rings, &mut index, &graph);

        let r = index.get(&AccountId::new("R")).unwrap();
        assert_eq!(r.laundering_stage, Some(LaunderingStage::MultiStage));
        // Fan-in contact at hour 0 precedes the cycle contact at hour 10.
        assert_eq!(
            r.flow_pattern,
            vec![PatternType::FanIn, PatternType::Cycle]
        );
        assert_eq!(r.suspicion_score, 30 + MULTI_STAGE_BONUS);
        assert!(r.detected_patterns.contains(&PatternTag::MultiStage));

        // Accounts in a single pattern type stay untouched.
        let b = index.get(&AccountId::new("B")).unwrap();
        assert_eq!(b.laundering_stage, None);
        assert!(b.flow_pattern.is_empty());
    }

    #[test]
    fn test_two_rings_same_type_not_tagged() {
        let mut batch = TransactionBatch::new();
        batch.add(Transaction::new(
            "TX-0",
            AccountId::new("A"),
            AccountId::new("B"),
            dec!(100),
            base(),
        ));
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();

        let rings = vec![
            ring(1, PatternType::Cycle, &["A", "B", "X"]),
            ring(2, PatternType::Cycle, &["A", "B", "Y"]),
        ];

        tag_multi_stage_flows(&rings, &mut index, &graph);

        let a = index.get(&AccountId::new("A")).unwrap();
        assert_eq!(a.laundering_stage, None);
        assert_eq!(a.suspicion_score, 0);
    }

    #[test]
    fn test_no_rings_short_circuits() {
        let mut batch = TransactionBatch::new();
        batch.add(Transaction::new(
            "TX-0",
            AccountId::new("A"),
            AccountId::new("B"),
            dec!(100),
            base(),
        ));
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();

        tag_multi_stage_flows(&[], &mut index, &graph);
        assert!(index.iter().all(|r| r.laundering_stage.is_none()));
    }
}

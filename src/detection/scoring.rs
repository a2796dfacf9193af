use crate::core::account::{AccountIndex, FanInPromotion, PatternTag};
use crate::detection::fan_patterns::FanPattern;
use crate::detection::shell_chain::ShellChains;
use crate::graph::cycle_detection::Cycle;
use crate::graph::transaction_graph::TransactionGraph;
use std::collections::{HashMap, HashSet};

/// Pattern weights.
pub const CYCLE_WEIGHT: u32 = 40;
pub const FAN_IN_WEIGHT: u32 = 30;
pub const FAN_OUT_WEIGHT: u32 = 30;
pub const SHELL_WEIGHT: u32 = 35;
pub const VELOCITY_WEIGHT: u32 = 15;

/// Transactions per day above which the velocity pattern triggers.
pub const VELOCITY_THRESHOLD: f64 = 15.0;

/// Combined degree above which an account is a dampening candidate.
pub const DAMPENING_DEGREE: usize = 100;
/// Share of inter-arrival gaps that must sit near the mean.
pub const DAMPENING_REGULARITY: f64 = 0.6;
/// Relative tolerance around the mean gap.
pub const DAMPENING_TOLERANCE: f64 = 0.3;
/// Score reduction for regular high-throughput accounts.
pub const DAMPENING_PENALTY: u32 = 30;

pub const LABEL_CYCLE: &str = "Cycle Detection (Bounded DFS)";
pub const LABEL_FAN_IN: &str = "Fan-In Smurfing (72h Sliding Window)";
pub const LABEL_FAN_OUT: &str = "Fan-Out Dispersal (72h Sliding Window)";
pub const LABEL_SHELL: &str = "Shell Chain Detection (BFS)";
pub const LABEL_VELOCITY: &str = "High Velocity Monitor";
pub const LABEL_DAMPENING: &str = "False Positive Dampening";

/// Stage 6: accumulate pattern scores, tags, labels, and explanations
/// for every account, then clamp to 0..=100.
///
/// High-throughput accounts with very regular timing and no cycle
/// membership get the false-positive reduction, which suppresses
/// merchants and payroll processors that would otherwise score on
/// volume alone.
pub fn score_accounts(
    index: &mut AccountIndex,
    graph: &TransactionGraph,
    cycles: &[Cycle],
    fan_ins: &[FanPattern],
    fan_outs: &[FanPattern],
    shells: &ShellChains,
) {
    let mut cycle_counts: HashMap<&crate::core::account::AccountId, usize> = HashMap::new();
    for cycle in cycles {
        for member in cycle {
            *cycle_counts.entry(member).or_insert(0) += 1;
        }
    }

    let fan_in_hubs: HashMap<_, _> = fan_ins.iter().map(|p| (&p.hub, p)).collect();
    let fan_out_hubs: HashMap<_, _> = fan_outs.iter().map(|p| (&p.hub, p)).collect();
    let shell_intermediaries: HashSet<_> = shells.intermediary_set();

    for record in index.iter_mut() {
        let id = record.account_id.clone();

        if let Some(&count) = cycle_counts.get(&id) {
            record.pattern_scores.cycle = CYCLE_WEIGHT;
            record.add_pattern(PatternTag::Cycle);
            record.add_algorithm(LABEL_CYCLE);
            let noun = if count == 1 { "cycle" } else { "cycles" };
            record.explain(format!("Appears in {} transaction {}", count, noun));
        }

        if let Some(pattern) = fan_in_hubs.get(&id) {
            record.pattern_scores.fan_in = FAN_IN_WEIGHT;
            record.add_pattern(PatternTag::FanIn);
            record.add_algorithm(LABEL_FAN_IN);
            record.fan_in_promotion = FanInPromotion::AggregationCandidate;
            record.explain(format!(
                "Received funds from {} distinct senders within 72 hours",
                pattern.counterparties.len()
            ));
        }

        if let Some(pattern) = fan_out_hubs.get(&id) {
            record.pattern_scores.fan_out = FAN_OUT_WEIGHT;
            record.add_pattern(PatternTag::FanOut);
            record.add_algorithm(LABEL_FAN_OUT);
            record.explain(format!(
                "Dispersed funds to {} distinct receivers within 72 hours",
                pattern.counterparties.len()
            ));
        }

        if shell_intermediaries.contains(&id) {
            record.pattern_scores.shell = SHELL_WEIGHT;
            record.add_pattern(PatternTag::ShellChain);
            record.add_algorithm(LABEL_SHELL);
            record.explain("Acts as a low-activity intermediary in a shell chain");
        }

        let touching = graph.transactions_touching(&id);
        if let Some(rate) = velocity_per_day(&touching) {
            if rate > VELOCITY_THRESHOLD {
                record.pattern_scores.velocity = VELOCITY_WEIGHT;
                record.add_pattern(PatternTag::HighVelocity);
                record.add_algorithm(LABEL_VELOCITY);
                record.explain(format!(
                    "High transaction velocity: {:.1} transactions per day",
                    rate
                ));
            }
        }

        record.recompute_from_patterns();

        let combined_degree = record.in_degree + record.out_degree;
        if combined_degree > DAMPENING_DEGREE
            && !cycle_counts.contains_key(&id)
            && has_regular_intervals(&touching)
        {
            record.dampen_score(DAMPENING_PENALTY);
            record.add_algorithm(LABEL_DAMPENING);
            record.explain(
                "Regular transaction timing at high degree suggests legitimate throughput",
            );
        }
    }
}

/// Transactions per day over the account's full activity span.
/// Spans shorter than a day count as one day.
fn velocity_per_day(touching: &[&crate::core::transaction::Transaction]) -> Option<f64> {
    if touching.is_empty() {
        return None;
    }
    let mut earliest = touching[0].timestamp();
    let mut latest = touching[0].timestamp();
    for tx in touching {
        earliest = earliest.min(tx.timestamp());
        latest = latest.max(tx.timestamp());
    }
    let span_days = (latest - earliest).num_seconds() as f64 / 86_400.0;
    Some(touching.len() as f64 / span_days.max(1.0))
}

/// True when more than [`DAMPENING_REGULARITY`] of the inter-arrival
/// gaps fall within ±[`DAMPENING_TOLERANCE`] of the mean gap.
fn has_regular_intervals(touching: &[&crate::core::transaction::Transaction]) -> bool {
    if touching.len() < 3 {
        return false;
    }
    let mut timestamps: Vec<_> = touching.iter().map(|tx| tx.timestamp()).collect();
    timestamps.sort();

    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds() as f64)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;

    let near_mean = intervals
        .iter()
        .filter(|&&gap| (gap - mean).abs() <= DAMPENING_TOLERANCE * mean)
        .count();
    near_mean as f64 / intervals.len() as f64 > DAMPENING_REGULARITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::AccountId;
    use crate::core::transaction::{Transaction, TransactionBatch};
    use crate::detection::fan_patterns::detect_fan_in;
    use crate::detection::shell_chain::detect_shell_chains;
    use crate::graph::cycle_detection::find_cycles;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn base() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_cycle_member_scores_forty() {
        let mut batch = TransactionBatch::new();
        for (i, (from, to)) in [("A", "B"), ("B", "C"), ("C", "A")].iter().enumerate() {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(*from),
                AccountId::new(*to),
                dec!(5000),
                base() + Duration::hours(i as i64),
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
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

        let a = index.get(&AccountId::new("A")).unwrap();
        assert_eq!(a.pattern_scores.cycle, CYCLE_WEIGHT);
        assert_eq!(a.suspicion_score, CYCLE_WEIGHT);
        assert!(a.is_suspicious);
        assert!(a.detected_patterns.contains(&PatternTag::Cycle));
        assert!(a
            .triggered_algorithms
            .iter()
            .any(|l| l == LABEL_CYCLE));
    }

    #[test]
    fn test_fan_in_receiver_becomes_candidate() {
        let mut batch = TransactionBatch::new();
        for i in 0..12 {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(format!("S{:02}", i)),
                AccountId::new("R"),
                dec!(900),
                base() + Duration::hours(i),
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();
        let fan_ins = detect_fan_in(&graph);

        score_accounts(
            &mut index,
            &graph,
            &[],
            &fan_ins,
            &[],
            &ShellChains::default(),
        );

        let r = index.get(&AccountId::new("R")).unwrap();
        assert_eq!(r.pattern_scores.fan_in, FAN_IN_WEIGHT);
        assert_eq!(r.fan_in_promotion, FanInPromotion::AggregationCandidate);
        // Twelve transactions over a floored one-day span stays under
        // the velocity threshold.
        assert_eq!(r.pattern_scores.velocity, 0);
        assert_eq!(r.suspicion_score, FAN_IN_WEIGHT);
    }

    #[test]
    fn test_shell_intermediary_scores() {
        let mut batch = TransactionBatch::new();
        for (i, (from, to)) in [("X", "S1"), ("S1", "S2"), ("S2", "S3"), ("S3", "Y")]
            .iter()
            .enumerate()
        {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(*from),
                AccountId::new(*to),
                dec!(1000),
                base() + Duration::days(i as i64),
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();
        let shells = detect_shell_chains(&graph, &index);

        score_accounts(&mut index, &graph, &[], &[], &[], &shells);

        for shell in ["S1", "S2", "S3"] {
            let record = index.get(&AccountId::new(shell)).unwrap();
            assert_eq!(record.pattern_scores.shell, SHELL_WEIGHT);
            assert!(record.detected_patterns.contains(&PatternTag::ShellChain));
        }
        let x = index.get(&AccountId::new("X")).unwrap();
        assert_eq!(x.pattern_scores.shell, 0);
    }

    #[test]
    fn test_merchant_dampening() {
        // 120 inbound payers on a fixed hourly schedule: high degree,
        // no cycle, very regular gaps.
        let mut batch = TransactionBatch::new();
        for i in 0..120 {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(format!("P{:03}", i)),
                AccountId::new("MERCHANT"),
                dec!(49),
                base() + Duration::hours(i),
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();

        score_accounts(
            &mut index,
            &graph,
            &[],
            &[],
            &[],
            &ShellChains::default(),
        );

        let merchant = index.get(&AccountId::new("MERCHANT")).unwrap();
        // Velocity (24/day) trips, then dampening claws it back.
        assert_eq!(merchant.pattern_scores.velocity, VELOCITY_WEIGHT);
        assert_eq!(merchant.suspicion_score, 0);
        assert!(merchant
            .triggered_algorithms
            .iter()
            .any(|l| l == LABEL_DAMPENING));
    }

    #[test]
    fn test_irregular_high_degree_not_dampened() {
        // Same degree, but bursty timing: gaps alternate wildly.
        let mut batch = TransactionBatch::new();
        let mut offset = Duration::zero();
        for i in 0..120 {
            offset = offset
                + if i % 2 == 0 {
                    Duration::minutes(5)
                } else {
                    Duration::hours(40)
                };
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new(format!("P{:03}", i)),
                AccountId::new("HUB"),
                dec!(49),
                base() + offset,
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();

        score_accounts(
            &mut index,
            &graph,
            &[],
            &[],
            &[],
            &ShellChains::default(),
        );

        let hub = index.get(&AccountId::new("HUB")).unwrap();
        assert!(!hub
            .triggered_algorithms
            .iter()
            .any(|l| l == LABEL_DAMPENING));
    }

    #[test]
    fn test_velocity_threshold_respects_span_floor() {
        // Ten transactions within one hour: span floors to a day, so the
        // rate is 10/day and velocity stays quiet.
        let mut batch = TransactionBatch::new();
        for i in 0..10 {
            batch.add(Transaction::new(
                format!("TX-{}", i),
                AccountId::new("A"),
                AccountId::new(format!("B{}", i)),
                dec!(10),
                base() + Duration::minutes(i),
            ));
        }
        let graph = TransactionGraph::from_batch(batch);
        let mut index = graph.build_account_index();

        score_accounts(
            &mut index,
            &graph,
            &[],
            &[],
            &[],
            &ShellChains::default(),
        );

        let a = index.get(&AccountId::new("A")).unwrap();
        assert_eq!(a.pattern_scores.velocity, 0);
        assert!(!a.is_suspicious);
    }
}

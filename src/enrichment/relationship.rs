use crate::core::account::{AccountId, AccountIndex};
use crate::core::transaction::Transaction;
use crate::graph::transaction_graph::TransactionGraph;
use chrono::Duration;
use std::collections::HashSet;

/// Transactions a counterparty pair needs before it counts as recurring.
pub const RECURRING_PAIR_MIN: usize = 5;
/// Relationship age that counts as established.
pub const ESTABLISHED_DAYS: i64 = 30;
/// Coefficient of variation under which amounts count as consistent.
pub const AMOUNT_CONSISTENCY_CV: f64 = 0.25;
/// Per-signal reduction and the overall bound.
pub const SIGNAL_REDUCTION: u32 = 5;
pub const MAX_REDUCTION: u32 = 20;

pub const LABEL_RELATIONSHIP: &str = "Relationship Intelligence";

/// Enrichment pass 1: reduce scores for accounts whose dominant
/// counterparty relationship matches a legitimate-activity profile.
///
/// Four signals are read off the account's busiest directed pair:
/// recurring volume, relationship age, amount consistency, and periodic
/// timing. Each contributes a small reduction, bounded overall; cycle
/// members are immune.
pub fn apply_relationship_intelligence(
    index: &mut AccountIndex,
    graph: &TransactionGraph,
    cycle_members: &HashSet<AccountId>,
) {
    for record in index.iter_mut() {
        if record.suspicion_score == 0 || cycle_members.contains(&record.account_id) {
            continue;
        }

        let Some(pair) = busiest_pair(&record.account_id, graph) else {
            continue;
        };

        let mut reduction = 0u32;
        if pair.len() >= RECURRING_PAIR_MIN {
            reduction += SIGNAL_REDUCTION;
        }
        if relationship_span(&pair) >= Duration::days(ESTABLISHED_DAYS) {
            reduction += SIGNAL_REDUCTION;
        }
        if amounts_consistent(&pair) {
            reduction += SIGNAL_REDUCTION;
        }
        if timing_periodic(&pair) {
            reduction += SIGNAL_REDUCTION;
        }

        let reduction = reduction.min(MAX_REDUCTION);
        if reduction > 0 {
            record.dampen_score(reduction);
            record.add_algorithm(LABEL_RELATIONSHIP);
            record.explain(format!(
                "Established counterparty relationship reduced the score by {}",
                reduction
            ));
        }
    }
}

/// The directed pair involving the account with the most transactions.
/// Outgoing pairs are considered before incoming; neighbor order breaks
/// ties, so the choice is deterministic.
fn busiest_pair<'g>(
    account: &AccountId,
    graph: &'g TransactionGraph,
) -> Option<Vec<&'g Transaction>> {
    let mut best: Option<Vec<&Transaction>> = None;

    for neighbor in graph.neighbors_out(account) {
        let txns = graph.edge_transactions(account, neighbor);
        if best.as_ref().map(|b| txns.len() > b.len()).unwrap_or(true) {
            best = Some(txns);
        }
    }
    for neighbor in graph.neighbors_in(account) {
        let txns = graph.edge_transactions(neighbor, account);
        if best.as_ref().map(|b| txns.len() > b.len()).unwrap_or(true) {
            best = Some(txns);
        }
    }

    best.filter(|txns| txns.len() >= 2)
}

fn relationship_span(pair: &[&Transaction]) -> Duration {
    let mut earliest = pair[0].timestamp();
    let mut latest = pair[0].timestamp();
    for tx in pair {
        earliest = earliest.min(tx.timestamp());
        latest = latest.max(tx.timestamp());
    }
    latest - earliest
}

fn amounts_consistent(pair: &[&Transaction]) -> bool {
    let amounts: Vec<f64> = pair
        .iter()
        .map(|tx| tx.amount().to_string().parse::<f64>().unwrap_or(0.0))
        .collect();
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    if mean <= 0.0 {
        return false;
    }
    let variance =
        amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    variance.sqrt() / mean < AMOUNT_CONSISTENCY_CV
}

fn timing_periodic(pair: &[&Transaction]) -> bool {
    if pair.len() < 3 {
        return false;
    }
    let mut timestamps: Vec<_> = pair.iter().map(|tx| tx.timestamp()).collect();
    timestamps.sort();
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    if mean <= 0.0 {
        return false;
    }
    let near = intervals
        .iter()
        .filter(|&&gap| (gap - mean).abs() <= 0.3 * mean)
        .count();
    near as f64 / intervals.len() as f64 > 0.6
}

use crate::core::account::AccountId;
use crate::core::transaction::Transaction;
use crate::graph::transaction_graph::TransactionGraph;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Width of the smurfing detection window.
pub const FAN_WINDOW_HOURS: i64 = 72;
/// Distinct counterparties required inside one window.
pub const FAN_THRESHOLD: usize = 10;

/// A triggered fan pattern: one hub collecting from (fan-in) or
/// dispersing to (fan-out) many distinct counterparties inside a 72-hour
/// window.
///
/// Only the first window that triggers for a hub is recorded; a longer
/// or later window with more counterparties is not reported.
#[derive(Debug, Clone)]
pub struct FanPattern {
    /// The receiver (fan-in) or sender (fan-out).
    pub hub: AccountId,
    /// Distinct counterparties in the triggering window, in order of
    /// first appearance after the per-hub timestamp sort.
    pub counterparties: Vec<AccountId>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Sum of the hub's transaction amounts inside the window.
    pub window_value: Decimal,
}

/// Detect fan-in (smurfing) hubs: receivers with at least
/// [`FAN_THRESHOLD`] distinct senders in one window.
pub fn detect_fan_in(graph: &TransactionGraph) -> Vec<FanPattern> {
    detect_fan(graph, Transaction::receiver_id, Transaction::sender_id)
}

/// Detect fan-out (dispersal) hubs: senders with at least
/// [`FAN_THRESHOLD`] distinct receivers in one window.
pub fn detect_fan_out(graph: &TransactionGraph) -> Vec<FanPattern> {
    detect_fan(graph, Transaction::sender_id, Transaction::receiver_id)
}

fn detect_fan(
    graph: &TransactionGraph,
    hub_of: for<'a> fn(&'a Transaction) -> &'a AccountId,
    counterparty_of: for<'a> fn(&'a Transaction) -> &'a AccountId,
) -> Vec<FanPattern> {
    // Group transactions per hub, hubs in first-appearance order.
    let mut hubs: Vec<AccountId> = Vec::new();
    let mut groups: HashMap<AccountId, Vec<&Transaction>> = HashMap::new();
    for tx in graph.transactions() {
        let hub = hub_of(tx);
        if !groups.contains_key(hub) {
            hubs.push(hub.clone());
        }
        groups.entry(hub.clone()).or_default().push(tx);
    }

    let window = Duration::hours(FAN_WINDOW_HOURS);
    let mut patterns = Vec::new();

    for hub in hubs {
        let mut txns = groups.remove(&hub).unwrap_or_default();
        // Stable sort: input order breaks timestamp ties.
        txns.sort_by_key(|tx| tx.timestamp());

        if let Some(pattern) = scan_windows(&hub, &txns, counterparty_of, window) {
            patterns.push(pattern);
        }
    }

    patterns
}

/// Two-pointer sweep over one hub's timestamp-sorted transactions.
/// Returns the first window holding the threshold, or None.
fn scan_windows(
    hub: &AccountId,
    txns: &[&Transaction],
    counterparty_of: for<'a> fn(&'a Transaction) -> &'a AccountId,
    window: Duration,
) -> Option<FanPattern> {
    let mut counts: HashMap<&AccountId, usize> = HashMap::new();
    let mut distinct = 0usize;
    let mut left = 0usize;

    for right in 0..txns.len() {
        let entry = counts.entry(counterparty_of(txns[right])).or_insert(0);
        if *entry == 0 {
            distinct += 1;
        }
        *entry += 1;

        // Transactions at exactly the window width stay in.
        while txns[right].timestamp() - txns[left].timestamp() > window {
            let leaving = counterparty_of(txns[left]);
            if let Some(count) = counts.get_mut(leaving) {
                *count -= 1;
                if *count == 0 {
                    distinct -= 1;
                }
            }
            left += 1;
        }

        if distinct >= FAN_THRESHOLD {
            let slice = &txns[left..=right];
            let mut counterparties = Vec::new();
            for tx in slice {
                let cp = counterparty_of(tx);
                if !counterparties.contains(cp) {
                    counterparties.push(cp.clone());
                }
            }
            let window_value = slice.iter().map(|tx| tx.amount()).sum();
            return Some(FanPattern {
                hub: hub.clone(),
                counterparties,
                window_start: txns[left].timestamp(),
                window_end: txns[right].timestamp(),
                window_value,
            });
        }
    }

    None
}

use crate::core::account::{AccountId, AccountIndex, FanInPromotion};
use crate::core::ring::{PatternType, Ring};
use crate::detection::fan_patterns::FanPattern;
use crate::graph::transaction_graph::TransactionGraph;
use chrono::Duration;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Outflow window after the last fan-in transaction.
pub const OUTFLOW_WINDOW_HOURS: i64 = 24;
/// Maximum hops explored when looking for amount-preserving shell paths.
pub const SHELL_PATH_MAX_HOPS: usize = 4;

/// Stage 9b: upgrade corroborated aggregation candidates.
///
/// Phase one already ran inside the scorer: every fan-in receiver
/// carries the `aggregation_candidate` flag. Phase two upgrades a
/// candidate to `confirmed_money_laundering` when any of four
/// corroborations holds:
///
/// 1. an outgoing path through at least one shell node preserves the
///    aggregated amount (bottleneck within ±20% of the window total);
/// 2. the receiver sits in a cycle ring, or sends to a cycle member;
/// 3. at least half the aggregated amount leaves the account within
///    24 hours of the last fan-in transaction;
/// 4. the receiver doubles as a shell node, a fan-out hub, or a cycle
///    member.
///
/// Promotion annotates the account and its explanation only; the
/// suspicion score never changes here.
pub fn promote_fan_in_candidates(
    index: &mut AccountIndex,
    graph: &TransactionGraph,
    rings: &[Ring],
    fan_ins: &[FanPattern],
    fan_out_hubs: &HashSet<AccountId>,
    shell_nodes: &HashSet<AccountId>,
) {
    let cycle_members: HashSet<AccountId> = rings
        .iter()
        .filter(|ring| ring.pattern_type == PatternType::Cycle)
        .flat_map(|ring| ring.members.iter().cloned())
        .collect();

    for pattern in fan_ins {
        let receiver = &pattern.hub;
        let candidate = index
            .get(receiver)
            .map(|record| record.fan_in_promotion == FanInPromotion::AggregationCandidate)
            .unwrap_or(false);
        if !candidate {
            continue;
        }

        let corroboration = if shell_path_preserves_amount(receiver, pattern, graph, shell_nodes) {
            Some("amount-preserving shell chain outflow")
        } else if cycle_members.contains(receiver)
            || graph
                .neighbors_out(receiver)
                .iter()
                .any(|n| cycle_members.contains(n))
        {
            Some("cycle ring participation")
        } else if rapid_layered_outflow(receiver, pattern, graph) {
            Some("rapid layered outflow")
        } else if shell_nodes.contains(receiver) || fan_out_hubs.contains(receiver) {
            Some("conflicting structural roles")
        } else {
            None
        };

        if let Some(reason) = corroboration {
            if let Some(record) = index.get_mut(receiver) {
                record.fan_in_promotion = FanInPromotion::ConfirmedMoneyLaundering;
                record.explain(format!("Fan-in aggregation corroborated by {}", reason));
            }
        }
    }
}

/// Condition 1: a bounded DFS over outgoing edges, expanding only
/// through shell nodes. A path of two or more hops whose bottleneck
/// (minimum aggregated edge amount) sits within ±20% of the window
/// total is amount preservation.
fn shell_path_preserves_amount(
    receiver: &AccountId,
    pattern: &FanPattern,
    graph: &TransactionGraph,
    shell_nodes: &HashSet<AccountId>,
) -> bool {
    let received = pattern.window_value;
    if received <= Decimal::ZERO {
        return false;
    }
    let tolerance = received * Decimal::new(2, 1);

    let mut stack: Vec<(AccountId, usize, Decimal, bool)> = graph
        .neighbors_out(receiver)
        .iter()
        .map(|next| {
            (
                next.clone(),
                1,
                graph.edge_total(receiver, next),
                shell_nodes.contains(next),
            )
        })
        .collect();

    while let Some((node, hops, bottleneck, through_shell)) = stack.pop() {
        if hops >= 2 && through_shell && (bottleneck - received).abs() <= tolerance {
            return true;
        }
        if hops >= SHELL_PATH_MAX_HOPS || !shell_nodes.contains(&node) {
            continue;
        }
        for next in graph.neighbors_out(&node) {
            if next == receiver || next == &node {
                continue;
            }
            let hop_total = graph.edge_total(&node, next);
            stack.push((next.clone(), hops + 1, bottleneck.min(hop_total), true));
        }
    }

    false
}

/// Condition 3: at least half the window total leaves the account
/// between the window start and 24 hours after the window end.
fn rapid_layered_outflow(
    receiver: &AccountId,
    pattern: &FanPattern,
    graph: &TransactionGraph,
) -> bool {
    let received = pattern.window_value;
    if received <= Decimal::ZERO {
        return false;
    }
    let deadline = pattern.window_end + Duration::hours(OUTFLOW_WINDOW_HOURS);

    let outflow: Decimal = graph
        .transactions_touching(receiver)
        .iter()
        .filter(|tx| {
            tx.sender_id() == receiver
                && !tx.is_self_transfer()
                && tx.timestamp() >= pattern.window_start
                && tx.timestamp() <= deadline
        })
        .map(|tx| tx.amount())
        .sum();

    outflow * Decimal::from(2) >= received
}

use crate::core::account::{AccountId, AccountIndex};
use crate::graph::transaction_graph::TransactionGraph;
use std::collections::{HashSet, VecDeque};

/// An account with at most this many transactions is a shell node.
pub const SHELL_MAX_TRANSACTIONS: usize = 3;
/// Chains need at least this many hops.
pub const SHELL_MIN_HOPS: usize = 3;
/// BFS depth bound in hops.
pub const SHELL_MAX_HOPS: usize = 6;

/// Raw output of the shell chain detector.
///
/// `chains` holds every qualifying path in emission order; the ring
/// builder later collapses them to one ring per connected component.
/// `intermediaries` is the ordered set of accounts observed as chain
/// interiors, which are the accounts that score as shell intermediaries.
#[derive(Debug, Clone, Default)]
pub struct ShellChains {
    pub chains: Vec<Vec<AccountId>>,
    pub intermediaries: Vec<AccountId>,
}

impl ShellChains {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn intermediary_set(&self) -> HashSet<AccountId> {
        self.intermediaries.iter().cloned().collect()
    }
}

/// Detect directed paths of 3..=6 hops routed through low-activity
/// accounts.
///
/// From every account, a breadth-first expansion walks outgoing edges.
/// A path is emitted once it has at least [`SHELL_MIN_HOPS`] hops and
/// every interior node is a shell node; expansion continues only through
/// shell nodes, so chains grow along low-activity corridors while the
/// endpoints may be ordinary accounts.
pub fn detect_shell_chains(graph: &TransactionGraph, index: &AccountIndex) -> ShellChains {
    let shell_nodes: HashSet<AccountId> = index
        .iter()
        .filter(|record| record.total_transactions <= SHELL_MAX_TRANSACTIONS)
        .map(|record| record.account_id.clone())
        .collect();

    let mut result = ShellChains::default();
    let mut interior_seen: HashSet<AccountId> = HashSet::new();

    for start in graph.nodes() {
        let mut queue: VecDeque<Vec<AccountId>> = VecDeque::new();
        queue.push_back(vec![start.clone()]);

        while let Some(path) = queue.pop_front() {
            let Some(current) = path.last().cloned() else {
                continue;
            };

            for next in graph.neighbors_out(&current) {
                if path.contains(next) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next.clone());
                let hops = extended.len() - 1;

                if hops >= SHELL_MIN_HOPS && interior_all_shell(&extended, &shell_nodes) {
                    for interior in &extended[1..extended.len() - 1] {
                        if interior_seen.insert(interior.clone()) {
                            result.intermediaries.push(interior.clone());
                        }
                    }
                    result.chains.push(extended.clone());
                }

                if shell_nodes.contains(next) && hops < SHELL_MAX_HOPS {
                    queue.push_back(extended);
                }
            }
        }
    }

    result
}

fn interior_all_shell(path: &[AccountId], shell_nodes: &HashSet<AccountId>) -> bool {
    path[1..path.len() - 1]
        .iter()
        .all(|node| shell_nodes.contains(node))
}

use crate::core::account::{AccountId, AccountIndex};
use crate::core::transaction::{Transaction, TransactionBatch};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// A directed multigraph of transactions between accounts.
///
/// Each directed account pair carries the list of transactions on that
/// edge in input order. Node and neighbor iteration follow first
/// appearance in the input, which downstream detectors rely on for
/// deterministic enumeration.
///
/// Self-edges are permitted and pass through unfiltered.
///
/// # Examples
///
/// ```
/// use fraud_ring_engine::prelude::*;
/// use chrono::{TimeZone, Utc};
/// use rust_decimal_macros::dec;
///
/// let mut batch = TransactionBatch::new();
/// let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
/// batch.add(Transaction::new(
///     "TX-1", AccountId::new("A"), AccountId::new("B"), dec!(100), t0,
/// ));
///
/// let graph = TransactionGraph::from_batch(batch);
/// assert_eq!(graph.node_count(), 2);
/// assert!(graph.has_edge(&AccountId::new("A"), &AccountId::new("B")));
/// ```
#[derive(Debug, Clone)]
pub struct TransactionGraph {
    /// The full batch, in input order. Edges store indices into this.
    transactions: Vec<Transaction>,
    /// All accounts in first-appearance order.
    nodes: Vec<AccountId>,
    node_set: HashSet<AccountId>,
    /// Distinct outgoing neighbors per account, first-appearance order.
    out_neighbors: HashMap<AccountId, Vec<AccountId>>,
    /// Distinct incoming neighbors per account, first-appearance order.
    in_neighbors: HashMap<AccountId, Vec<AccountId>>,
    /// (sender, receiver) -> transaction indices in input order.
    edges: HashMap<(AccountId, AccountId), Vec<usize>>,
    /// Account -> indices of transactions touching it, input order.
    touching: HashMap<AccountId, Vec<usize>>,
}

impl TransactionGraph {
    /// Build the graph from a batch, preserving input order everywhere.
    pub fn from_batch(batch: TransactionBatch) -> Self {
        let transactions: Vec<Transaction> = batch.transactions().to_vec();
        let mut graph = Self {
            transactions: Vec::new(),
            nodes: Vec::new(),
            node_set: HashSet::new(),
            out_neighbors: HashMap::new(),
            in_neighbors: HashMap::new(),
            edges: HashMap::new(),
            touching: HashMap::new(),
        };

        for (idx, tx) in transactions.iter().enumerate() {
            let sender = tx.sender_id().clone();
            let receiver = tx.receiver_id().clone();

            graph.observe_node(&sender);
            graph.observe_node(&receiver);

            let out = graph.out_neighbors.entry(sender.clone()).or_default();
            if !out.contains(&receiver) {
                out.push(receiver.clone());
            }
            let inc = graph.in_neighbors.entry(receiver.clone()).or_default();
            if !inc.contains(&sender) {
                inc.push(sender.clone());
            }

            graph
                .edges
                .entry((sender.clone(), receiver.clone()))
                .or_default()
                .push(idx);

            graph.touching.entry(sender.clone()).or_default().push(idx);
            if !tx.is_self_transfer() {
                graph.touching.entry(receiver).or_default().push(idx);
            }
        }

        graph.transactions = transactions;
        graph
    }

    fn observe_node(&mut self, id: &AccountId) {
        if self.node_set.insert(id.clone()) {
            self.nodes.push(id.clone());
        }
    }

    /// All transactions in input order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// All accounts in first-appearance order.
    pub fn nodes(&self) -> &[AccountId] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Distinct accounts this account sends to, first-appearance order.
    pub fn neighbors_out(&self, id: &AccountId) -> &[AccountId] {
        self.out_neighbors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct accounts sending to this account, first-appearance order.
    pub fn neighbors_in(&self, id: &AccountId) -> &[AccountId] {
        self.in_neighbors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_degree(&self, id: &AccountId) -> usize {
        self.neighbors_out(id).len()
    }

    pub fn in_degree(&self, id: &AccountId) -> usize {
        self.neighbors_in(id).len()
    }

    pub fn has_edge(&self, sender: &AccountId, receiver: &AccountId) -> bool {
        self.edges
            .contains_key(&(sender.clone(), receiver.clone()))
    }

    /// Transactions on the directed edge `sender -> receiver`, input order.
    pub fn edge_transactions(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
    ) -> Vec<&Transaction> {
        self.edges
            .get(&(sender.clone(), receiver.clone()))
            .map(|indices| indices.iter().map(|&i| &self.transactions[i]).collect())
            .unwrap_or_default()
    }

    /// First transaction on the edge in input order.
    pub fn edge_first(&self, sender: &AccountId, receiver: &AccountId) -> Option<&Transaction> {
        self.edges
            .get(&(sender.clone(), receiver.clone()))
            .and_then(|indices| indices.first())
            .map(|&i| &self.transactions[i])
    }

    /// Earliest transaction on the edge by timestamp; input order breaks
    /// ties.
    pub fn edge_earliest(&self, sender: &AccountId, receiver: &AccountId) -> Option<&Transaction> {
        self.edge_transactions(sender, receiver)
            .into_iter()
            .min_by_key(|tx| tx.timestamp())
    }

    /// Aggregated amount on the edge.
    pub fn edge_total(&self, sender: &AccountId, receiver: &AccountId) -> Decimal {
        self.edge_transactions(sender, receiver)
            .iter()
            .map(|tx| tx.amount())
            .sum()
    }

    /// Transactions touching the account as sender or receiver, input
    /// order. A self-transfer appears once.
    pub fn transactions_touching(&self, id: &AccountId) -> Vec<&Transaction> {
        self.touching
            .get(id)
            .map(|indices| indices.iter().map(|&i| &self.transactions[i]).collect())
            .unwrap_or_default()
    }

    /// Stage 1 output: one record per account with totals and degrees
    /// filled in, in first-appearance order.
    pub fn build_account_index(&self) -> AccountIndex {
        let mut index = AccountIndex::new();
        for id in &self.nodes {
            index.get_or_create(id);
        }

        for tx in &self.transactions {
            if let Some(sender) = index.get_mut(tx.sender_id()) {
                sender.total_amount_sent += tx.amount();
            }
            if let Some(receiver) = index.get_mut(tx.receiver_id()) {
                receiver.total_amount_received += tx.amount();
            }
        }

        for record in index.iter_mut() {
            let id = record.account_id.clone();
            record.total_transactions = self
                .touching
                .get(&id)
                .map(|indices| indices.len())
                .unwrap_or(0);
            record.out_degree = self.neighbors_out(&id).len();
            record.in_degree = self.neighbors_in(&id).len();
        }

        index
    }
}

use crate::core::ring::{PatternType, RingId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a bank account in the transaction network.
///
/// # Examples
///
/// ```
/// use fraud_ring_engine::core::account::AccountId;
///
/// let a = AccountId::new("ACC-001");
/// let b = AccountId::new("ACC-002");
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Pattern tags an account can trigger over the course of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTag {
    Cycle,
    FanIn,
    FanOut,
    ShellChain,
    HighVelocity,
    MultiStage,
    Community,
}

impl fmt::Display for PatternTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            PatternTag::Cycle => "cycle",
            PatternTag::FanIn => "fan_in",
            PatternTag::FanOut => "fan_out",
            PatternTag::ShellChain => "shell_chain",
            PatternTag::HighVelocity => "high_velocity",
            PatternTag::MultiStage => "multi_stage",
            PatternTag::Community => "community",
        };
        write!(f, "{}", tag)
    }
}

/// Role an account plays inside a ring, assigned by the leadership pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RingRole {
    Peripheral,
    Intermediary,
    Orchestrator,
}

/// Laundering stage classification from the multi-stage pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunderingStage {
    MultiStage,
}

/// Two-phase fan-in promotion state for a receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanInPromotion {
    #[default]
    None,
    AggregationCandidate,
    ConfirmedMoneyLaundering,
}

/// Per-pattern score contributions. The suspicion score is derived from
/// the sum of these, plus bounded deltas applied by enrichment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PatternScores {
    pub fan_in: u32,
    pub fan_out: u32,
    pub cycle: u32,
    pub shell: u32,
    pub velocity: u32,
}

impl PatternScores {
    pub fn sum(&self) -> u32 {
        self.fan_in + self.fan_out + self.cycle + self.shell + self.velocity
    }
}

/// Mutable per-account state, created on first observation of an id and
/// mutated only by the pipeline stages, in stage order.
///
/// A positive `suspicion_score` marks the account suspicious. Scores are
/// always clamped to 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: AccountId,
    /// Count of transactions touching this account as sender or receiver.
    pub total_transactions: usize,
    /// Number of distinct counterparties with an edge into this account.
    pub in_degree: usize,
    /// Number of distinct counterparties this account has an edge to.
    pub out_degree: usize,
    pub total_amount_sent: Decimal,
    pub total_amount_received: Decimal,
    pub pattern_scores: PatternScores,
    pub suspicion_score: u32,
    pub detected_patterns: Vec<PatternTag>,
    pub ring_ids: Vec<RingId>,
    pub triggered_algorithms: Vec<String>,
    /// Period-joined sentence log explaining every score contribution.
    pub explanation: String,
    pub is_suspicious: bool,
    /// Normalised ring-local betweenness, filled by the leadership pass.
    pub centrality_score: f64,
    pub ring_role: Option<RingRole>,
    pub laundering_stage: Option<LaunderingStage>,
    pub flow_pattern: Vec<PatternType>,
    pub fan_in_promotion: FanInPromotion,
}

impl AccountRecord {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            total_transactions: 0,
            in_degree: 0,
            out_degree: 0,
            total_amount_sent: Decimal::ZERO,
            total_amount_received: Decimal::ZERO,
            pattern_scores: PatternScores::default(),
            suspicion_score: 0,
            detected_patterns: Vec::new(),
            ring_ids: Vec::new(),
            triggered_algorithms: Vec::new(),
            explanation: String::new(),
            is_suspicious: false,
            centrality_score: 0.0,
            ring_role: None,
            laundering_stage: None,
            flow_pattern: Vec::new(),
            fan_in_promotion: FanInPromotion::None,
        }
    }

    /// Re-derive the suspicion score from the pattern score sum alone,
    /// clamped to 100, and refresh the suspicious flag. Used when a
    /// pattern contribution is retracted.
    pub fn recompute_from_patterns(&mut self) {
        self.suspicion_score = self.pattern_scores.sum().min(100);
        self.is_suspicious = self.suspicion_score > 0;
    }

    /// Apply a bounded positive delta, capped at 100.
    pub fn boost_score(&mut self, delta: u32) {
        self.suspicion_score = (self.suspicion_score + delta).min(100);
        self.is_suspicious = self.suspicion_score > 0;
    }

    /// Apply a bounded negative delta, floored at 0.
    pub fn dampen_score(&mut self, delta: u32) {
        self.suspicion_score = self.suspicion_score.saturating_sub(delta);
        self.is_suspicious = self.suspicion_score > 0;
    }

    /// Record a pattern tag, keeping the list ordered and unique.
    pub fn add_pattern(&mut self, tag: PatternTag) {
        if !self.detected_patterns.contains(&tag) {
            self.detected_patterns.push(tag);
        }
    }

    pub fn remove_pattern(&mut self, tag: PatternTag) {
        self.detected_patterns.retain(|t| *t != tag);
    }

    /// Record a triggered algorithm label, ordered and unique.
    pub fn add_algorithm(&mut self, label: &str) {
        if !self.triggered_algorithms.iter().any(|l| l == label) {
            self.triggered_algorithms.push(label.to_string());
        }
    }

    /// Append a sentence to the explanation log.
    pub fn explain(&mut self, sentence: impl AsRef<str>) {
        if !self.explanation.is_empty() {
            self.explanation.push_str(". ");
        }
        self.explanation.push_str(sentence.as_ref());
    }

    pub fn add_ring(&mut self, ring_id: RingId) {
        if !self.ring_ids.contains(&ring_id) {
            self.ring_ids.push(ring_id);
        }
    }

    pub fn remove_ring(&mut self, ring_id: &RingId) {
        self.ring_ids.retain(|r| r != ring_id);
    }

    /// Replace every ring id in `subsumed` by the community ring id.
    /// The community id lands at the end of the list.
    pub fn subsume_rings(&mut self, subsumed: &[RingId], community: RingId) {
        self.ring_ids.retain(|r| !subsumed.contains(r));
        self.add_ring(community);
    }

    /// Promote the ring role, never downgrading an already stronger one.
    pub fn upgrade_role(&mut self, role: RingRole) {
        match self.ring_role {
            Some(current) if current >= role => {}
            _ => self.ring_role = Some(role),
        }
    }

    /// First ring id, or the empty string. Convenience projection for
    /// downstream consumers.
    pub fn primary_ring_id(&self) -> &str {
        self.ring_ids.first().map(|r| r.as_str()).unwrap_or("")
    }
}

/// Insertion-ordered collection of account records, keyed by id.
///
/// Iteration follows first-appearance order of the ids in the input,
/// which is part of the determinism contract: every pipeline stage that
/// walks the accounts observes the same order.
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    slots: HashMap<AccountId, usize>,
    records: Vec<AccountRecord>,
}

impl AccountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the record for `id`, creating it on first observation.
    pub fn get_or_create(&mut self, id: &AccountId) -> &mut AccountRecord {
        if let Some(&slot) = self.slots.get(id) {
            return &mut self.records[slot];
        }
        let slot = self.records.len();
        self.slots.insert(id.clone(), slot);
        self.records.push(AccountRecord::new(id.clone()));
        &mut self.records[slot]
    }

    pub fn get(&self, id: &AccountId) -> Option<&AccountRecord> {
        self.slots.get(id).map(|&slot| &self.records[slot])
    }

    pub fn get_mut(&mut self, id: &AccountId) -> Option<&mut AccountRecord> {
        self.slots.get(id).copied().map(|slot| &mut self.records[slot])
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AccountRecord> {
        self.records.iter()
    }

    /// Mutable records in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AccountRecord> {
        self.records.iter_mut()
    }

    /// Account ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &AccountId> {
        self.records.iter().map(|r| &r.account_id)
    }

    /// Consume the index, yielding records in insertion order.
    pub fn into_records(self) -> Vec<AccountRecord> {
        self.records
    }
}

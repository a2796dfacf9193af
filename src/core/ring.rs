use crate::core::account::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a fraud ring within one analysis run.
///
/// Pattern rings use a shared monotonic `RING_###` sequence; community
/// rings use a separate `RING_COMM_###` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RingId(String);

impl RingId {
    /// Id for the `n`-th pattern ring (1-based).
    pub fn pattern(n: usize) -> Self {
        Self(format!("RING_{:03}", n))
    }

    /// Id for the `n`-th community ring (1-based).
    pub fn community(n: usize) -> Self {
        Self(format!("RING_COMM_{:03}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The structural pattern a ring was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    FanIn,
    FanOut,
    ShellChain,
    Community,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternType::Cycle => "cycle",
            PatternType::FanIn => "fan_in",
            PatternType::FanOut => "fan_out",
            PatternType::ShellChain => "shell_chain",
            PatternType::Community => "community",
        };
        write!(f, "{}", name)
    }
}

/// A detected fraud ring: a group of accounts participating in one
/// suspicious structure.
///
/// Members are held by value so ring removal and subsumption never
/// require pointer bookkeeping. For cycle rings `members` is the cycle
/// traversal order; for fan rings the hub comes first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub ring_id: RingId,
    pub pattern_type: PatternType,
    pub members: Vec<AccountId>,
    pub member_count: usize,
    /// Risk score, 0..=100.
    pub risk_score: u32,
    /// Sum of in-ring transaction amounts. Zero for fan rings.
    pub total_value: Decimal,
    pub explanation: String,
}

impl Ring {
    pub fn new(
        ring_id: RingId,
        pattern_type: PatternType,
        members: Vec<AccountId>,
        risk_score: u32,
        total_value: Decimal,
        explanation: String,
    ) -> Self {
        let member_count = members.len();
        Self {
            ring_id,
            pattern_type,
            members,
            member_count,
            risk_score,
            total_value,
            explanation,
        }
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }
}

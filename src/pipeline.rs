//! The nine-stage detection pipeline.
//!
//! `analyze` is the single entry point of the core: it consumes a
//! transaction batch and a detection mode and runs every stage on the
//! calling thread, to completion, with no shared or persistent state.
//! Later stages read and mutate the account index and ring list left by
//! earlier ones, so the stage order here is part of the observable
//! contract.

use crate::core::account::{AccountId, AccountRecord};
use crate::core::ring::Ring;
use crate::core::transaction::TransactionBatch;
use crate::detection::fan_patterns::{detect_fan_in, detect_fan_out};
use crate::detection::ring_builder::build_rings;
use crate::detection::scoring::score_accounts;
use crate::detection::shell_chain::{detect_shell_chains, ShellChains};
use crate::enrichment::leadership::assign_ring_roles;
use crate::enrichment::multi_stage::tag_multi_stage_flows;
use crate::enrichment::relationship::apply_relationship_intelligence;
use crate::enrichment::temporal::validate_cycle_rings;
use crate::graph::cycle_detection::{cycle_member_set, find_cycles};
use crate::graph::transaction_graph::TransactionGraph;
use crate::network::community::detect_communities;
use crate::network::promotion::promote_fan_in_candidates;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Selects which detectors run. Disabled detectors produce empty
/// results; scoring, enrichment, and community detection still run on
/// whatever was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    #[default]
    All,
    Cycles,
    FanIn,
    FanOut,
    Shell,
}

impl DetectionMode {
    fn cycles_enabled(self) -> bool {
        matches!(self, DetectionMode::All | DetectionMode::Cycles)
    }

    fn fan_in_enabled(self) -> bool {
        matches!(self, DetectionMode::All | DetectionMode::FanIn)
    }

    fn fan_out_enabled(self) -> bool {
        matches!(self, DetectionMode::All | DetectionMode::FanOut)
    }

    fn shell_enabled(self) -> bool {
        matches!(self, DetectionMode::All | DetectionMode::Shell)
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMode::All => "all",
            DetectionMode::Cycles => "cycles",
            DetectionMode::FanIn => "fan-in",
            DetectionMode::FanOut => "fan-out",
            DetectionMode::Shell => "shell",
        };
        write!(f, "{}", name)
    }
}

/// Error for unknown detection mode strings.
#[derive(Debug, Error)]
#[error("unknown detection mode '{0}', expected all | cycles | fan-in | fan-out | shell")]
pub struct ModeParseError(String);

impl FromStr for DetectionMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DetectionMode::All),
            "cycles" => Ok(DetectionMode::Cycles),
            "fan-in" => Ok(DetectionMode::FanIn),
            "fan-out" => Ok(DetectionMode::FanOut),
            "shell" => Ok(DetectionMode::Shell),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// Run statistics returned alongside the accounts and rings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub total_transactions: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

/// Projection of one suspicious account for consumers that only need
/// the headline fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedAccount {
    pub account_id: AccountId,
    pub suspicion_score: u32,
    /// First entry of the account's ring ids, or empty.
    pub ring_id: String,
}

/// Full output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Every account, sorted by suspicion score descending (stable, so
    /// first appearance breaks ties).
    pub accounts: Vec<AccountRecord>,
    /// Every ring, sorted by risk score descending.
    pub fraud_rings: Vec<Ring>,
    pub summary: Summary,
}

impl AnalysisResult {
    /// One projection entry per suspicious account, in account order.
    pub fn flagged_accounts(&self) -> Vec<FlaggedAccount> {
        self.accounts
            .iter()
            .filter(|record| record.is_suspicious)
            .map(|record| FlaggedAccount {
                account_id: record.account_id.clone(),
                suspicion_score: record.suspicion_score,
                ring_id: record.primary_ring_id().to_string(),
            })
            .collect()
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Fraud Ring Analysis ===")?;
        writeln!(f, "Accounts analyzed:   {}", self.summary.total_accounts_analyzed)?;
        writeln!(f, "Transactions:        {}", self.summary.total_transactions)?;
        writeln!(f, "Suspicious accounts: {}", self.summary.suspicious_accounts_flagged)?;
        writeln!(f, "Fraud rings:         {}", self.summary.fraud_rings_detected)?;
        writeln!(f, "Processing time:     {:.3}s", self.summary.processing_time_seconds)?;

        if self.summary.fraud_rings_detected > 0 {
            writeln!(f, "\n--- Fraud Rings ---")?;
            for ring in &self.fraud_rings {
                writeln!(
                    f,
                    "  {} [{}] risk={} members={} value={}",
                    ring.ring_id,
                    ring.pattern_type,
                    ring.risk_score,
                    ring.member_count,
                    ring.total_value
                )?;
            }
        }

        if self.summary.suspicious_accounts_flagged > 0 {
            writeln!(f, "\n--- Suspicious Accounts ---")?;
            for record in self.accounts.iter().filter(|r| r.is_suspicious) {
                writeln!(
                    f,
                    "  {} score={} patterns=[{}]",
                    record.account_id,
                    record.suspicion_score,
                    record
                        .detected_patterns
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full detection pipeline over a batch.
///
/// Pathological inputs (self-transfers, duplicate edges, zero time
/// spans, disconnected graphs, empty batches) produce well-defined
/// degenerate outputs; the pipeline never fails on data.
pub fn analyze(batch: TransactionBatch, mode: DetectionMode) -> AnalysisResult {
    let started = Instant::now();
    info!(transactions = batch.len(), %mode, "starting fraud ring analysis");

    // Stage 1: graph and account index.
    let graph = TransactionGraph::from_batch(batch);
    let mut index = graph.build_account_index();
    debug!(accounts = index.len(), "transaction graph built");

    // Stages 2-5: detectors, gated by mode.
    let cycles = if mode.cycles_enabled() {
        find_cycles(&graph)
    } else {
        Vec::new()
    };
    let fan_ins = if mode.fan_in_enabled() {
        detect_fan_in(&graph)
    } else {
        Vec::new()
    };
    let fan_outs = if mode.fan_out_enabled() {
        detect_fan_out(&graph)
    } else {
        Vec::new()
    };
    let shells = if mode.shell_enabled() {
        detect_shell_chains(&graph, &index)
    } else {
        ShellChains::default()
    };
    debug!(
        cycles = cycles.len(),
        fan_ins = fan_ins.len(),
        fan_outs = fan_outs.len(),
        shell_chains = shells.chains.len(),
        "detectors finished"
    );

    // Stage 6: scoring.
    score_accounts(&mut index, &graph, &cycles, &fan_ins, &fan_outs, &shells);

    // Stage 7: ring materialization.
    let mut rings = build_rings(&mut index, &graph, &cycles, &fan_ins, &fan_outs, &shells);

    // Stage 8: enrichment, in fixed order.
    let cycle_members = cycle_member_set(&cycles);
    apply_relationship_intelligence(&mut index, &graph, &cycle_members);
    validate_cycle_rings(&mut rings, &mut index, &graph);
    assign_ring_roles(&rings, &mut index, &graph);
    tag_multi_stage_flows(&rings, &mut index, &graph);

    // Stage 9: community merging, then fan-in promotion.
    let fan_in_hubs: HashSet<AccountId> = fan_ins.iter().map(|p| p.hub.clone()).collect();
    let fan_out_hubs: HashSet<AccountId> = fan_outs.iter().map(|p| p.hub.clone()).collect();
    let shell_nodes = shells.intermediary_set();
    detect_communities(
        &mut rings,
        &mut index,
        &graph,
        &fan_in_hubs,
        &fan_out_hubs,
        &shell_nodes,
    );
    promote_fan_in_candidates(
        &mut index,
        &graph,
        &rings,
        &fan_ins,
        &fan_out_hubs,
        &shell_nodes,
    );

    #[cfg(debug_assertions)]
    assert_consistent(&index, &rings);

    let mut accounts = index.into_records();
    accounts.sort_by(|a, b| b.suspicion_score.cmp(&a.suspicion_score));

    let summary = Summary {
        total_accounts_analyzed: accounts.len(),
        total_transactions: graph.transaction_count(),
        suspicious_accounts_flagged: accounts.iter().filter(|r| r.is_suspicious).count(),
        fraud_rings_detected: rings.len(),
        processing_time_seconds: started.elapsed().as_secs_f64(),
    };
    info!(
        suspicious = summary.suspicious_accounts_flagged,
        rings = summary.fraud_rings_detected,
        "analysis finished"
    );

    AnalysisResult {
        accounts,
        fraud_rings: rings,
        summary,
    }
}

/// Stage-boundary checks for programmer errors; compiled out of release
/// builds.
#[cfg(debug_assertions)]
fn assert_consistent(index: &crate::core::account::AccountIndex, rings: &[Ring]) {
    use crate::core::ring::PatternType;

    for ring in rings {
        for member in &ring.members {
            assert!(
                index.contains(member),
                "ring {} references unknown account {}",
                ring.ring_id,
                member
            );
        }
        if ring.pattern_type == PatternType::Cycle {
            assert!(
                ring.members.len() >= 3,
                "cycle ring {} has fewer than 3 members",
                ring.ring_id
            );
        }
    }
    for record in index.iter() {
        assert!(record.suspicion_score <= 100);
        assert_eq!(record.is_suspicious, record.suspicion_score > 0);
    }
}

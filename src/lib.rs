//! # fraud-ring-engine
//!
//! Deterministic fraud ring detection and suspicion scoring over bank
//! transaction graphs.
//!
//! Given a batch of transactions, the engine builds a directed
//! multigraph, runs five pattern detectors (bounded cycles, fan-in
//! smurfing, fan-out dispersal, shell chains, high velocity), scores
//! every account 0..=100 with false-positive dampening, materializes
//! fraud rings, enriches them (temporal cycle validation, ring
//! leadership via betweenness centrality, multi-stage flow tagging),
//! merges overlapping rings into mule communities, and promotes
//! corroborated fan-in receivers.
//!
//! The pipeline is a pure batch computation: single-threaded, stateless
//! between runs, and bit-identical on repeated inputs.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: transactions, accounts, rings
//! - **graph** — Transaction multigraph, bounded cycle enumeration
//! - **detection** — Fan patterns, shell chains, scoring, ring building
//! - **enrichment** — Ordered post-detection passes over account state
//! - **network** — Community detection and two-phase fan-in promotion
//! - **simulation** — Random batch generation for tests and benchmarks

pub mod core;
pub mod detection;
pub mod enrichment;
pub mod graph;
pub mod network;
pub mod pipeline;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::account::{AccountId, AccountRecord, FanInPromotion, RingRole};
    pub use crate::core::ring::{PatternType, Ring, RingId};
    pub use crate::core::transaction::{Transaction, TransactionBatch};
    pub use crate::graph::transaction_graph::TransactionGraph;
    pub use crate::pipeline::{analyze, AnalysisResult, DetectionMode, Summary};
}

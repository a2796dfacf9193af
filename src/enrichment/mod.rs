//! Post-detection enrichment passes, applied in fixed order:
//! relationship intelligence, temporal cycle validation, ring
//! leadership, multi-stage flow tagging.

pub mod leadership;
pub mod multi_stage;
pub mod relationship;
pub mod temporal;

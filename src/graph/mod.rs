//! Transaction graph construction and cycle enumeration.

pub mod cycle_detection;
pub mod transaction_graph;

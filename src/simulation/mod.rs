//! Synthetic batch generation for benchmarks and the CLI.

pub mod generator;

//! Analyze a randomly generated batch and print the report.
//!
//! ```bash
//! cargo run --example basic_analysis
//! ```

use fraud_ring_engine::pipeline::{analyze, DetectionMode};
use fraud_ring_engine::simulation::generator::{generate_random_batch, BatchConfig};

fn main() {
    let config = BatchConfig {
        account_count: 40,
        transaction_count: 300,
        ..Default::default()
    };
    let batch = generate_random_batch(&config);

    let result = analyze(batch, DetectionMode::All);
    println!("{}", result);
}

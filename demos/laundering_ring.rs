//! A seeded laundering scenario: a cycle feeding a smurfing hub.
//!
//! ```bash
//! cargo run --example laundering_ring
//! ```

use chrono::{Duration, TimeZone, Utc};
use fraud_ring_engine::core::account::AccountId;
use fraud_ring_engine::core::transaction::{Transaction, TransactionBatch};
use fraud_ring_engine::pipeline::{analyze, DetectionMode};
use rust_decimal_macros::dec;

fn main() {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut batch = TransactionBatch::new();

    // Twelve smurfs feed the aggregator.
    for i in 0..12 {
        batch.add(Transaction::new(
            format!("SMURF-{:02}", i),
            AccountId::new(format!("MULE-{:02}", i)),
            AccountId::new("AGGREGATOR"),
            dec!(950),
            base + Duration::hours(i),
        ));
    }

    // The aggregator cycles the pooled funds back through two partners.
    batch.add(Transaction::new(
        "LOOP-1",
        AccountId::new("AGGREGATOR"),
        AccountId::new("PARTNER-1"),
        dec!(9000),
        base + Duration::hours(20),
    ));
    batch.add(Transaction::new(
        "LOOP-2",
        AccountId::new("PARTNER-1"),
        AccountId::new("PARTNER-2"),
        dec!(8700),
        base + Duration::hours(26),
    ));
    batch.add(Transaction::new(
        "LOOP-3",
        AccountId::new("PARTNER-2"),
        AccountId::new("AGGREGATOR"),
        dec!(8400),
        base + Duration::hours(31),
    ));

    let result = analyze(batch, DetectionMode::All);
    println!("{}", result);

    println!("--- Flagged projection ---");
    for entry in result.flagged_accounts() {
        println!(
            "  {} score={} ring={}",
            entry.account_id,
            entry.suspicion_score,
            if entry.ring_id.is_empty() { "-" } else { &entry.ring_id }
        );
    }
}

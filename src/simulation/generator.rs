//! Random transaction batch generation.
//!
//! Produces synthetic batches for benchmarks and the CLI `generate`
//! subcommand. The pipeline itself never uses randomness; everything
//! random lives here.

use crate::core::account::AccountId;
use crate::core::transaction::{Transaction, TransactionBatch};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Configuration for generating a random transaction batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of accounts in the pool.
    pub account_count: usize,
    /// Number of transactions to generate.
    pub transaction_count: usize,
    /// Minimum transaction amount.
    pub min_amount: Decimal,
    /// Maximum transaction amount.
    pub max_amount: Decimal,
    /// Activity span in days.
    pub span_days: i64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            account_count: 20,
            transaction_count: 100,
            min_amount: Decimal::from(50),
            max_amount: Decimal::from(20_000),
            span_days: 30,
        }
    }
}

/// Generate a random batch for testing and benchmarking.
pub fn generate_random_batch(config: &BatchConfig) -> TransactionBatch {
    let mut rng = rand::thread_rng();
    let mut batch = TransactionBatch::new();
    if config.account_count < 2 {
        return batch;
    }

    let accounts: Vec<AccountId> = (0..config.account_count)
        .map(|i| AccountId::new(format!("ACC-{:04}", i)))
        .collect();

    let base: DateTime<Utc> = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let span_seconds = Duration::days(config.span_days.max(1)).num_seconds();

    let min: f64 = config.min_amount.to_string().parse().unwrap_or(50.0);
    let max: f64 = config.max_amount.to_string().parse().unwrap_or(20_000.0);

    for _ in 0..config.transaction_count {
        let sender_idx = rng.gen_range(0..accounts.len());
        let mut receiver_idx = rng.gen_range(0..accounts.len());
        while receiver_idx == sender_idx {
            receiver_idx = rng.gen_range(0..accounts.len());
        }

        let amount = Decimal::from_f64_retain(rng.gen_range(min..max))
            .unwrap_or(Decimal::from(100))
            .round_dp(2);
        if amount <= Decimal::ZERO {
            continue;
        }

        let offset = Duration::seconds(rng.gen_range(0..span_seconds));
        batch.add(Transaction::new(
            Uuid::new_v4().to_string(),
            accounts[sender_idx].clone(),
            accounts[receiver_idx].clone(),
            amount,
            base + offset,
        ));
    }

    batch
}

use crate::core::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single bank transfer between two accounts.
///
/// Transactions are the sole input to the detection pipeline and are
/// immutable once created. Input order is preserved end to end: the
/// graph, the detectors, and the ring counters all observe transactions
/// in the order they were loaded.
///
/// # Examples
///
/// ```
/// use fraud_ring_engine::core::transaction::Transaction;
/// use fraud_ring_engine::core::account::AccountId;
/// use chrono::{TimeZone, Utc};
/// use rust_decimal_macros::dec;
///
/// let tx = Transaction::new(
///     "TX-0001",
///     AccountId::new("ACC-A"),
///     AccountId::new("ACC-B"),
///     dec!(5000),
///     Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
/// );
///
/// assert_eq!(tx.amount(), dec!(5000));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for this transaction.
    transaction_id: String,
    /// The account the funds leave.
    sender_id: AccountId,
    /// The account the funds arrive at.
    receiver_id: AccountId,
    /// The transferred amount. Must be positive.
    amount: Decimal,
    /// When the transfer happened, second resolution.
    #[serde(with = "timestamp_format")]
    timestamp: DateTime<Utc>,
}

/// Wire format for timestamps: `YYYY-MM-DD HH:MM:SS`.
mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is not positive. Upstream validation is
    /// expected to reject non-positive amounts before they reach the
    /// core.
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        assert!(
            amount > Decimal::ZERO,
            "Transaction amount must be positive, got {}",
            amount
        );
        Self {
            transaction_id: transaction_id.into(),
            sender_id,
            receiver_id,
            amount,
            timestamp,
        }
    }

    // --- Accessors ---

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn sender_id(&self) -> &AccountId {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &AccountId {
        &self.receiver_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// True when sender and receiver are the same account.
    /// Self-transfers pass through the pipeline unfiltered.
    pub fn is_self_transfer(&self) -> bool {
        self.sender_id == self.receiver_id
    }
}

/// An ordered batch of transactions submitted for analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionBatch {
    transactions: Vec<Transaction>,
}

impl TransactionBatch {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
        }
    }

    pub fn add(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Total value moved across the batch.
    pub fn total_value(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount()).sum()
    }

    /// All account ids in the batch, in order of first appearance
    /// (sender before receiver per transaction).
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut seen = std::collections::HashSet::new();
        let mut accounts = Vec::new();
        for tx in &self.transactions {
            for id in [tx.sender_id(), tx.receiver_id()] {
                if seen.insert(id.clone()) {
                    accounts.push(id.clone());
                }
            }
        }
        accounts
    }
}

impl FromIterator<Transaction> for TransactionBatch {
    fn from_iter<T: IntoIterator<Item = Transaction>>(iter: T) -> Self {
        Self {
            transactions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_transaction() -> Transaction {
        Transaction::new(
            "TX-1",
            AccountId::new("A"),
            AccountId::new("B"),
            dec!(1000),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_transaction_creation() {
        let tx = sample_transaction();
        assert_eq!(tx.transaction_id(), "TX-1");
        assert_eq!(tx.sender_id().as_str(), "A");
        assert_eq!(tx.receiver_id().as_str(), "B");
        assert_eq!(tx.amount(), dec!(1000));
        assert!(!tx.is_self_transfer());
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn test_transaction_zero_amount() {
        Transaction::new(
            "TX-2",
            AccountId::new("A"),
            AccountId::new("B"),
            Decimal::ZERO,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        );
    }

    #[test]
    fn test_timestamp_wire_format() {
        let tx = sample_transaction();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"2024-03-01 12:00:00\""));

        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp(), tx.timestamp());
    }

    #[test]
    fn test_batch_accounts_first_appearance_order() {
        let mut batch = TransactionBatch::new();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        batch.add(Transaction::new(
            "TX-1",
            AccountId::new("C"),
            AccountId::new("A"),
            dec!(10),
            t0,
        ));
        batch.add(Transaction::new(
            "TX-2",
            AccountId::new("A"),
            AccountId::new("B"),
            dec!(20),
            t0,
        ));

        let accounts = batch.accounts();
        assert_eq!(
            accounts,
            vec![AccountId::new("C"), AccountId::new("A"), AccountId::new("B")]
        );
        assert_eq!(batch.total_value(), dec!(30));
    }

    #[test]
    fn test_self_transfer_passes_through() {
        let tx = Transaction::new(
            "TX-3",
            AccountId::new("A"),
            AccountId::new("A"),
            dec!(5),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        );
        assert!(tx.is_self_transfer());
    }
}

//! Models exchanged between the fetcher, the normalizer and the sync engine.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw transaction record as returned by the block explorer.
///
/// Upstream payloads are loosely typed; every field is optional and unknown
/// fields are ignored so one malformed record never aborts a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransactionRecord {
    #[serde(default)]
    pub hash: Option<String>,
    /// Net balance change in the smallest currency unit (satoshis).
    #[serde(default)]
    pub balance_change: Option<i64>,
    /// Primary block time field, `%Y-%m-%d %H:%M:%S`.
    #[serde(default)]
    pub time: Option<String>,
    /// Fallback time field used when `time` is absent.
    #[serde(default)]
    pub block_time: Option<String>,
}

/// A normalized transaction ready for dedup and insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionCandidate {
    pub tx_hash: String,
    pub amount: Decimal,
    pub timestamp: Option<NaiveDateTime>,
}

/// Outcome of one sync run, for logging and inline callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub new_transactions: usize,
    pub last_synced_offset: i64,
    pub balance: Decimal,
}

//! Domain models for tracked addresses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Synchronization lifecycle of a tracked address.
///
/// `InProgress` is persisted before the sync run starts so the state is
/// observable while the run executes; `Error` is persisted before a run
/// fault propagates to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Unsynced,
    InProgress,
    Done,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unsynced => "UNSYNCED",
            SyncStatus::InProgress => "IN_PROGRESS",
            SyncStatus::Done => "DONE",
            SyncStatus::Error => "ERROR",
        }
    }

    /// Parses the persisted text form. Unknown values map to `Unsynced`
    /// rather than failing a whole row load.
    pub fn from_db(value: &str) -> Self {
        match value {
            "IN_PROGRESS" => SyncStatus::InProgress,
            "DONE" => SyncStatus::Done,
            "ERROR" => SyncStatus::Error,
            _ => SyncStatus::Unsynced,
        }
    }
}

/// A tracked external account with its sync state and running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Count of upstream records already processed; resumes pagination.
    pub last_synced_offset: i64,
    pub balance: Decimal,
}

/// Payload for registering a new address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub address: String,
}

/// Address details plus the stored transaction count, as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressOverview {
    pub id: String,
    pub address: String,
    pub balance: Decimal,
    pub transaction_count: i64,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

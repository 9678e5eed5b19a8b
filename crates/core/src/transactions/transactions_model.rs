//! Domain models for stored transactions.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One balance-changing event recorded for an address.
///
/// Immutable once stored; created only by the sync engine and removed only
/// through the owning address's cascading delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub address_id: String,
    /// Upstream hash, unique within one address's transaction set.
    pub tx_hash: String,
    /// Net balance change in principal currency units, 8 decimal places.
    pub amount: Decimal,
    /// Upstream block time; None when the explorer record carried no
    /// parseable time field.
    pub timestamp: Option<NaiveDateTime>,
}

/// Insert payload produced by the sync engine for one normalized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub address_id: String,
    pub tx_hash: String,
    pub amount: Decimal,
    pub timestamp: Option<NaiveDateTime>,
}

/// One page of stored transactions plus the total count for the address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total_transactions: i64,
    pub limit: i64,
    pub offset: i64,
}

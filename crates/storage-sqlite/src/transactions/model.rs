//! Database model for the transactions table.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use cointrack_core::sync::BLOCK_TIME_FORMAT;
use cointrack_core::transactions::Transaction;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub address_id: String,
    pub tx_hash: String,
    pub amount: String,
    pub timestamp: Option<String>,
    pub created_at: String,
}

pub(crate) fn format_block_time(timestamp: Option<NaiveDateTime>) -> Option<String> {
    timestamp.map(|ts| ts.format(BLOCK_TIME_FORMAT).to_string())
}

fn parse_block_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, BLOCK_TIME_FORMAT).ok()
}

impl From<TransactionDB> for Transaction {
    fn from(db: TransactionDB) -> Self {
        Transaction {
            amount: Decimal::from_str(&db.amount).unwrap_or_default(),
            timestamp: db.timestamp.as_deref().and_then(parse_block_time),
            id: db.id,
            address_id: db.address_id,
            tx_hash: db.tx_hash,
        }
    }
}

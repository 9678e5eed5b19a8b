//! Database model for the addresses table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use cointrack_core::addresses::{Address, SyncStatus};

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
#[diesel(table_name = crate::schema::addresses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AddressDB {
    pub id: String,
    pub address: String,
    pub created_at: String,
    pub sync_status: String,
    pub last_synced_at: Option<String>,
    pub last_synced_offset: i64,
    pub balance: String,
}

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<AddressDB> for Address {
    fn from(db: AddressDB) -> Self {
        Address {
            created_at: parse_utc(&db.created_at).unwrap_or_else(Utc::now),
            sync_status: SyncStatus::from_db(&db.sync_status),
            last_synced_at: db.last_synced_at.as_deref().and_then(parse_utc),
            balance: Decimal::from_str(&db.balance).unwrap_or_default(),
            id: db.id,
            address: db.address,
            last_synced_offset: db.last_synced_offset,
        }
    }
}

impl From<Address> for AddressDB {
    fn from(address: Address) -> Self {
        AddressDB {
            id: address.id,
            address: address.address,
            created_at: address.created_at.to_rfc3339(),
            sync_status: address.sync_status.as_str().to_string(),
            last_synced_at: address.last_synced_at.map(|dt| dt.to_rfc3339()),
            last_synced_offset: address.last_synced_offset,
            balance: address.balance.to_string(),
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use cointrack_core::addresses::{Address, AddressRepositoryTrait, NewAddress, SyncStatus};
use cointrack_core::{Error, Result};

use super::model::AddressDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::addresses;

pub struct AddressRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl AddressRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        AddressRepository { pool, writer }
    }

    fn get_address_impl(&self, address_id: &str) -> Result<Address> {
        let mut conn = get_connection(&self.pool)?;
        let row = addresses::table
            .find(address_id)
            .first::<AddressDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Address::from)
            .ok_or_else(|| Error::not_found(format!("Address {} not found", address_id)))
    }
}

#[async_trait]
impl AddressRepositoryTrait for AddressRepository {
    fn get_address(&self, address_id: &str) -> Result<Address> {
        self.get_address_impl(address_id)
    }

    fn find_by_address(&self, address: &str) -> Result<Option<Address>> {
        let mut conn = get_connection(&self.pool)?;
        let row = addresses::table
            .filter(addresses::address.eq(address))
            .first::<AddressDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Address::from))
    }

    fn list_addresses(&self) -> Result<Vec<Address>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = addresses::table
            .order(addresses::created_at.asc())
            .load::<AddressDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn insert_new_address(&self, new_address: NewAddress) -> Result<Address> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Address> {
                let row = AddressDB {
                    id: Uuid::new_v4().to_string(),
                    address: new_address.address,
                    created_at: Utc::now().to_rfc3339(),
                    sync_status: SyncStatus::Unsynced.as_str().to_string(),
                    last_synced_at: None,
                    last_synced_offset: 0,
                    balance: Decimal::ZERO.to_string(),
                };

                let inserted = diesel::insert_into(addresses::table)
                    .values(&row)
                    .returning(AddressDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Address::from(inserted))
            })
            .await
    }

    async fn set_sync_status(&self, address_id: String, status: SyncStatus) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(addresses::table.find(&address_id))
                    .set(addresses::sync_status.eq(status.as_str()))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(Error::not_found(format!(
                        "Address {} not found",
                        address_id
                    )));
                }
                Ok(())
            })
            .await
    }

    async fn complete_sync(
        &self,
        address_id: String,
        last_synced_offset: i64,
        last_synced_at: DateTime<Utc>,
        balance: Decimal,
        status: SyncStatus,
    ) -> Result<Address> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Address> {
                diesel::update(addresses::table.find(&address_id))
                    .set((
                        addresses::last_synced_offset.eq(last_synced_offset),
                        addresses::last_synced_at.eq(Some(last_synced_at.to_rfc3339())),
                        addresses::balance.eq(balance.to_string()),
                        addresses::sync_status.eq(status.as_str()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let row = addresses::table
                    .find(&address_id)
                    .first::<AddressDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                row.map(Address::from)
                    .ok_or_else(|| Error::not_found(format!("Address {} not found", address_id)))
            })
            .await
    }

    async fn delete_address(&self, address_id: String) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let affected = diesel::delete(addresses::table.find(&address_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(affected)
            })
            .await
    }
}

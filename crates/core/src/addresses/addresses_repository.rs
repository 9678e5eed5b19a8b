//! Repository contract for tracked addresses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{Address, NewAddress, SyncStatus};
use crate::Result;

/// Persistence seam consumed by the address service and the sync engine.
///
/// Reads are synchronous; writes go through the storage crate's serialized
/// writer and are therefore async.
#[async_trait]
pub trait AddressRepositoryTrait: Send + Sync {
    /// Loads one address by id, failing with `Error::NotFound` if unknown.
    fn get_address(&self, address_id: &str) -> Result<Address>;

    /// Looks up an address by its external string form.
    fn find_by_address(&self, address: &str) -> Result<Option<Address>>;

    fn list_addresses(&self) -> Result<Vec<Address>>;

    async fn insert_new_address(&self, new_address: NewAddress) -> Result<Address>;

    /// Persists only the sync status, leaving cursor and balance untouched.
    async fn set_sync_status(&self, address_id: String, status: SyncStatus) -> Result<()>;

    /// Finalizes a sync run: cursor, completion time, recomputed balance and
    /// terminal status are written as one update.
    async fn complete_sync(
        &self,
        address_id: String,
        last_synced_offset: i64,
        last_synced_at: DateTime<Utc>,
        balance: Decimal,
        status: SyncStatus,
    ) -> Result<Address>;

    /// Deletes the address; its transactions go with it (cascade).
    async fn delete_address(&self, address_id: String) -> Result<usize>;
}

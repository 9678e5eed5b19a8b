//! Address registration and lookup service.

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::{Address, AddressOverview, AddressRepositoryTrait, NewAddress, SyncStatus};
use crate::transactions::TransactionRepositoryTrait;
use crate::{Error, Result};

#[async_trait]
pub trait AddressServiceTrait: Send + Sync {
    /// Registers a new address, failing with `Error::Conflict` when the
    /// address string is already tracked.
    async fn register_address(&self, new_address: NewAddress) -> Result<Address>;

    fn get_address(&self, address_id: &str) -> Result<Address>;

    /// Address details plus its stored transaction count.
    fn get_address_overview(&self, address_id: &str) -> Result<AddressOverview>;

    /// Resolves the entity id for an external address string.
    fn lookup_by_address(&self, address: &str) -> Result<Address>;

    fn list_addresses(&self) -> Result<Vec<Address>>;

    /// Overviews for every tracked address, built from one listing query
    /// plus a count per row. A row deleted after the listing simply is not
    /// in the result; it cannot fail the whole call.
    fn list_address_overviews(&self) -> Result<Vec<AddressOverview>>;

    /// Flips the status to IN_PROGRESS ahead of a background run so callers
    /// polling the address see it immediately. Fails with NotFound if the id
    /// is unknown.
    async fn mark_sync_in_progress(&self, address_id: &str) -> Result<()>;

    /// Deletes the address and, via cascade, all of its transactions.
    async fn delete_address(&self, address_id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct AddressService {
    address_repository: Arc<dyn AddressRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
}

impl AddressService {
    pub fn new(
        address_repository: Arc<dyn AddressRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            address_repository,
            transaction_repository,
        }
    }

    fn overview_for(&self, address: Address) -> Result<AddressOverview> {
        let transaction_count = self.transaction_repository.count_for_address(&address.id)?;
        Ok(AddressOverview {
            id: address.id,
            address: address.address,
            balance: address.balance,
            transaction_count,
            sync_status: address.sync_status,
            last_synced_at: address.last_synced_at,
        })
    }
}

#[async_trait]
impl AddressServiceTrait for AddressService {
    async fn register_address(&self, new_address: NewAddress) -> Result<Address> {
        if let Some(existing) = self.address_repository.find_by_address(&new_address.address)? {
            return Err(Error::conflict(format!(
                "Address {} already exists (id={})",
                existing.address, existing.id
            )));
        }

        let created = self.address_repository.insert_new_address(new_address).await?;
        debug!("Registered address {} (id={})", created.address, created.id);
        Ok(created)
    }

    fn get_address(&self, address_id: &str) -> Result<Address> {
        self.address_repository.get_address(address_id)
    }

    fn get_address_overview(&self, address_id: &str) -> Result<AddressOverview> {
        let address = self.address_repository.get_address(address_id)?;
        self.overview_for(address)
    }

    fn lookup_by_address(&self, address: &str) -> Result<Address> {
        self.address_repository
            .find_by_address(address)?
            .ok_or_else(|| Error::not_found(format!("Address {} not found", address)))
    }

    fn list_addresses(&self) -> Result<Vec<Address>> {
        self.address_repository.list_addresses()
    }

    fn list_address_overviews(&self) -> Result<Vec<AddressOverview>> {
        self.address_repository
            .list_addresses()?
            .into_iter()
            .map(|address| self.overview_for(address))
            .collect()
    }

    async fn mark_sync_in_progress(&self, address_id: &str) -> Result<()> {
        // get_address doubles as the NotFound check for the trigger endpoint.
        let address = self.address_repository.get_address(address_id)?;
        self.address_repository
            .set_sync_status(address.id, SyncStatus::InProgress)
            .await
    }

    async fn delete_address(&self, address_id: &str) -> Result<()> {
        let affected = self
            .address_repository
            .delete_address(address_id.to_string())
            .await?;
        if affected == 0 {
            return Err(Error::not_found(format!(
                "Address {} not found",
                address_id
            )));
        }
        Ok(())
    }
}

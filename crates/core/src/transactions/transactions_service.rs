//! Read-side service for listing an address's stored transactions.

use async_trait::async_trait;
use std::sync::Arc;

use super::{TransactionPage, TransactionRepositoryTrait};
use crate::addresses::AddressRepositoryTrait;
use crate::Result;

#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    /// Newest-first page of transactions for one address, with the total
    /// count. Fails with NotFound when the address id is unknown.
    fn list_for_address(&self, address_id: &str, limit: i64, offset: i64)
        -> Result<TransactionPage>;
}

#[derive(Clone)]
pub struct TransactionService {
    address_repository: Arc<dyn AddressRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
}

impl TransactionService {
    pub fn new(
        address_repository: Arc<dyn AddressRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            address_repository,
            transaction_repository,
        }
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    fn list_for_address(
        &self,
        address_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<TransactionPage> {
        let address = self.address_repository.get_address(address_id)?;
        let transactions = self
            .transaction_repository
            .list_paginated(&address.id, limit, offset)?;
        let total_transactions = self.transaction_repository.count_for_address(&address.id)?;

        Ok(TransactionPage {
            transactions,
            total_transactions,
            limit,
            offset,
        })
    }
}

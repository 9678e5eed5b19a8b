//! Repository contract for stored transactions.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{NewTransaction, Transaction};
use crate::Result;

/// Persistence seam for transactions. The sync engine relies on
/// `exists_by_hash` for duplicate detection and `sum_amounts` for the
/// balance recomputation at the end of a run.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    /// True when this address already stores a transaction with this hash.
    fn exists_by_hash(&self, address_id: &str, tx_hash: &str) -> Result<bool>;

    fn count_for_address(&self, address_id: &str) -> Result<i64>;

    /// Sum of all stored amounts for the address; zero when none exist.
    fn sum_amounts(&self, address_id: &str) -> Result<Decimal>;

    /// Newest-first page of transactions for one address.
    fn list_paginated(
        &self,
        address_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>>;

    /// Inserts one page of transactions as a single unit: either all rows of
    /// the page land or none do.
    async fn insert_batch(&self, new_transactions: Vec<NewTransaction>) -> Result<usize>;
}

//! The incremental sync engine.
//!
//! One invocation drives a run-to-completion loop for a single address:
//! fetch a page, normalize it, skip duplicates, persist the remainder as one
//! unit, advance the cursor. Re-running the same range is idempotent because
//! duplicate detection skips already-inserted hashes, so a crash between
//! pages loses at most one page of progress.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as RunMutex, OwnedMutexGuard};

use super::{normalize_record, SyncSummary, TransactionFetcher};
use crate::addresses::{Address, AddressRepositoryTrait, SyncStatus};
use crate::transactions::{NewTransaction, TransactionRepositoryTrait};
use crate::{Error, Result};

/// Records requested per explorer page.
pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Rounds a raw amount sum to 8 decimal places, clamping magnitudes below
/// 1e-8 to exactly zero.
pub fn settle_balance(sum: Decimal) -> Decimal {
    let rounded = sum.round_dp(8);
    if rounded.abs() < Decimal::new(1, 8) {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Exclusive claim on one address's run lock. Dropping it releases the lock,
/// whether or not a run happened.
#[derive(Debug)]
pub struct SyncPermit {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
pub trait SyncServiceTrait: Send + Sync {
    /// Claims the address's run lock without starting the run, failing fast
    /// with `Error::SyncInProgress` when another run already holds it. Lets a
    /// dispatcher reject a concurrent trigger before handing the run to a
    /// background task.
    fn try_begin(&self, address_id: &str) -> Result<SyncPermit>;

    /// Runs one sync under a previously claimed permit, returning what the
    /// run changed. On any fault the address's ERROR status is persisted
    /// before the fault propagates.
    async fn sync_with_permit(
        &self,
        address_id: &str,
        permit: SyncPermit,
    ) -> Result<SyncSummary>;

    /// Claims the lock and runs inline; see `try_begin` and
    /// `sync_with_permit` for the failure modes.
    async fn sync_address(&self, address_id: &str) -> Result<SyncSummary>;
}

pub struct SyncService {
    address_repository: Arc<dyn AddressRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    fetcher: Arc<dyn TransactionFetcher>,
    batch_size: i64,
    // One lock per address id, created lazily. Entries are never removed;
    // the set of tracked addresses is small.
    run_locks: Mutex<HashMap<String, Arc<RunMutex<()>>>>,
}

impl SyncService {
    pub fn new(
        address_repository: Arc<dyn AddressRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        fetcher: Arc<dyn TransactionFetcher>,
    ) -> Self {
        Self {
            address_repository,
            transaction_repository,
            fetcher,
            batch_size: DEFAULT_BATCH_SIZE,
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn run_lock(&self, address_id: &str) -> Arc<RunMutex<()>> {
        let mut locks = self
            .run_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(address_id.to_string()).or_default().clone()
    }

    async fn run(&self, address: &Address) -> Result<SyncSummary> {
        let mut offset = address.last_synced_offset;
        let mut new_transactions = 0usize;

        loop {
            let page = self
                .fetcher
                .fetch_page(&address.address, offset, self.batch_size)
                .await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len() as i64;

            let mut batch = Vec::new();
            let mut page_hashes = HashSet::new();
            for raw in &page {
                let Some(candidate) = normalize_record(raw) else {
                    continue;
                };
                // The composite unique index would abort the whole batch on a
                // hash repeated within one page.
                if !page_hashes.insert(candidate.tx_hash.clone()) {
                    continue;
                }
                if self
                    .transaction_repository
                    .exists_by_hash(&address.id, &candidate.tx_hash)?
                {
                    // Already synced in a prior run.
                    continue;
                }
                batch.push(NewTransaction {
                    address_id: address.id.clone(),
                    tx_hash: candidate.tx_hash,
                    amount: candidate.amount,
                    timestamp: candidate.timestamp,
                });
            }

            if !batch.is_empty() {
                new_transactions += self.transaction_repository.insert_batch(batch).await?;
            }
            debug!(
                "Committed page at offset {} for address {} ({} records)",
                offset, address.address, page_len
            );

            if page_len < self.batch_size {
                // Short page signals exhaustion.
                offset += page_len;
                break;
            }
            offset += self.batch_size;
        }

        // Balance is recomputed from everything now stored, not accumulated
        // incrementally, so a resumed run converges to the same value.
        let balance = settle_balance(self.transaction_repository.sum_amounts(&address.id)?);
        self.address_repository
            .complete_sync(
                address.id.clone(),
                offset,
                Utc::now(),
                balance,
                SyncStatus::Done,
            )
            .await?;

        Ok(SyncSummary {
            new_transactions,
            last_synced_offset: offset,
            balance,
        })
    }
}

#[async_trait]
impl SyncServiceTrait for SyncService {
    fn try_begin(&self, address_id: &str) -> Result<SyncPermit> {
        let guard = self
            .run_lock(address_id)
            .try_lock_owned()
            .map_err(|_| Error::SyncInProgress(address_id.to_string()))?;
        Ok(SyncPermit { _guard: guard })
    }

    async fn sync_with_permit(
        &self,
        address_id: &str,
        permit: SyncPermit,
    ) -> Result<SyncSummary> {
        let _permit = permit;

        let address = self.address_repository.get_address(address_id)?;
        self.address_repository
            .set_sync_status(address.id.clone(), SyncStatus::InProgress)
            .await?;

        match self.run(&address).await {
            Ok(summary) => {
                info!(
                    "Sync complete for address {}: {} new transactions, offset {}, balance {}",
                    address.address,
                    summary.new_transactions,
                    summary.last_synced_offset,
                    summary.balance
                );
                Ok(summary)
            }
            Err(err) => {
                // Persist the terminal status before the fault propagates;
                // polling the address is the caller's only error channel.
                if let Err(status_err) = self
                    .address_repository
                    .set_sync_status(address.id.clone(), SyncStatus::Error)
                    .await
                {
                    error!(
                        "Failed to persist ERROR status for address {}: {}",
                        address.id, status_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn sync_address(&self, address_id: &str) -> Result<SyncSummary> {
        let permit = self.try_begin(address_id)?;
        self.sync_with_permit(address_id, permit).await
    }
}

#[cfg(test)]
mod settle_tests {
    use super::settle_balance;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_eight_decimal_places() {
        assert_eq!(settle_balance(dec!(0.123456789)), dec!(0.12345679));
    }

    #[test]
    fn clamps_magnitudes_below_epsilon_to_zero() {
        assert_eq!(settle_balance(dec!(0.000001) + dec!(-0.000001)), Decimal::ZERO);
        assert_eq!(settle_balance(dec!(0.000000001)), Decimal::ZERO);
        assert_eq!(settle_balance(dec!(-0.000000004)), Decimal::ZERO);
    }

    #[test]
    fn keeps_exact_epsilon_value() {
        assert_eq!(settle_balance(dec!(0.00000001)), dec!(0.00000001));
    }
}

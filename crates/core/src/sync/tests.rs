//! Engine tests against in-memory repositories and scripted fetchers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::addresses::{
    Address, AddressRepositoryTrait, AddressService, AddressServiceTrait, NewAddress, SyncStatus,
};
use crate::sync::{
    FetchError, RawTransactionRecord, SyncService, SyncServiceTrait, TransactionFetcher,
};
use crate::transactions::{NewTransaction, Transaction, TransactionRepositoryTrait};
use crate::{Error, Result};

#[derive(Default)]
struct MemoryStore {
    addresses: Mutex<HashMap<String, Address>>,
    transactions: Mutex<Vec<Transaction>>,
    status_log: Mutex<Vec<SyncStatus>>,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    fn with_address(address: &str) -> (Arc<Self>, String) {
        let store = Arc::new(Self::default());
        let entity = Address {
            id: format!("id-{}", address),
            address: address.to_string(),
            created_at: Utc::now(),
            sync_status: SyncStatus::Unsynced,
            last_synced_at: None,
            last_synced_offset: 0,
            balance: Decimal::ZERO,
        };
        let id = entity.id.clone();
        store
            .addresses
            .lock()
            .unwrap()
            .insert(id.clone(), entity);
        (store, id)
    }

    fn address(&self, address_id: &str) -> Address {
        self.addresses.lock().unwrap()[address_id].clone()
    }

    fn statuses(&self) -> Vec<SyncStatus> {
        self.status_log.lock().unwrap().clone()
    }

    fn seed_transaction(&self, address_id: &str, tx_hash: &str, amount: Decimal) {
        let mut transactions = self.transactions.lock().unwrap();
        transactions.push(Transaction {
            id: format!("seed-{}", tx_hash),
            address_id: address_id.to_string(),
            tx_hash: tx_hash.to_string(),
            amount,
            timestamp: None,
        });
    }
}

#[async_trait]
impl AddressRepositoryTrait for MemoryStore {
    fn get_address(&self, address_id: &str) -> Result<Address> {
        self.addresses
            .lock()
            .unwrap()
            .get(address_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Address {} not found", address_id)))
    }

    fn find_by_address(&self, address: &str) -> Result<Option<Address>> {
        Ok(self
            .addresses
            .lock()
            .unwrap()
            .values()
            .find(|a| a.address == address)
            .cloned())
    }

    fn list_addresses(&self) -> Result<Vec<Address>> {
        Ok(self.addresses.lock().unwrap().values().cloned().collect())
    }

    async fn insert_new_address(&self, new_address: NewAddress) -> Result<Address> {
        let entity = Address {
            id: format!("id-{}", new_address.address),
            address: new_address.address,
            created_at: Utc::now(),
            sync_status: SyncStatus::Unsynced,
            last_synced_at: None,
            last_synced_offset: 0,
            balance: Decimal::ZERO,
        };
        self.addresses
            .lock()
            .unwrap()
            .insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    async fn set_sync_status(&self, address_id: String, status: SyncStatus) -> Result<()> {
        let mut addresses = self.addresses.lock().unwrap();
        let address = addresses
            .get_mut(&address_id)
            .ok_or_else(|| Error::not_found(format!("Address {} not found", address_id)))?;
        address.sync_status = status;
        self.status_log.lock().unwrap().push(status);
        Ok(())
    }

    async fn complete_sync(
        &self,
        address_id: String,
        last_synced_offset: i64,
        last_synced_at: DateTime<Utc>,
        balance: Decimal,
        status: SyncStatus,
    ) -> Result<Address> {
        let mut addresses = self.addresses.lock().unwrap();
        let address = addresses
            .get_mut(&address_id)
            .ok_or_else(|| Error::not_found(format!("Address {} not found", address_id)))?;
        address.last_synced_offset = last_synced_offset;
        address.last_synced_at = Some(last_synced_at);
        address.balance = balance;
        address.sync_status = status;
        self.status_log.lock().unwrap().push(status);
        Ok(address.clone())
    }

    async fn delete_address(&self, address_id: String) -> Result<usize> {
        let removed = self.addresses.lock().unwrap().remove(&address_id);
        self.transactions
            .lock()
            .unwrap()
            .retain(|tx| tx.address_id != address_id);
        Ok(usize::from(removed.is_some()))
    }
}

#[async_trait]
impl TransactionRepositoryTrait for MemoryStore {
    fn exists_by_hash(&self, address_id: &str, tx_hash: &str) -> Result<bool> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.address_id == address_id && tx.tx_hash == tx_hash))
    }

    fn count_for_address(&self, address_id: &str) -> Result<i64> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| tx.address_id == address_id)
            .count() as i64)
    }

    fn sum_amounts(&self, address_id: &str) -> Result<Decimal> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| tx.address_id == address_id)
            .map(|tx| tx.amount)
            .sum())
    }

    fn list_paginated(
        &self,
        address_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| tx.address_id == address_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn insert_batch(&self, new_transactions: Vec<NewTransaction>) -> Result<usize> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::Unexpected("store unavailable".to_string()));
        }
        let mut transactions = self.transactions.lock().unwrap();
        let inserted = new_transactions.len();
        let seq = transactions.len();
        for (i, new_tx) in new_transactions.into_iter().enumerate() {
            transactions.push(Transaction {
                id: format!("tx-{}-{}", seq, i),
                address_id: new_tx.address_id,
                tx_hash: new_tx.tx_hash,
                amount: new_tx.amount,
                timestamp: new_tx.timestamp,
            });
        }
        Ok(inserted)
    }
}

/// Returns pre-scripted pages in order, then empty pages; records the
/// offset of every call.
#[derive(Default)]
struct ScriptedFetcher {
    pages: Mutex<VecDeque<std::result::Result<Vec<RawTransactionRecord>, FetchError>>>,
    offsets: Mutex<Vec<i64>>,
}

impl ScriptedFetcher {
    fn new(
        pages: Vec<std::result::Result<Vec<RawTransactionRecord>, FetchError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            offsets: Mutex::new(Vec::new()),
        })
    }

    fn seen_offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        _address: &str,
        offset: i64,
        _limit: i64,
    ) -> std::result::Result<Vec<RawTransactionRecord>, FetchError> {
        self.offsets.lock().unwrap().push(offset);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Blocks the first fetch until released, to hold a run open.
struct BlockingFetcher {
    release: Notify,
}

#[async_trait]
impl TransactionFetcher for BlockingFetcher {
    async fn fetch_page(
        &self,
        _address: &str,
        _offset: i64,
        _limit: i64,
    ) -> std::result::Result<Vec<RawTransactionRecord>, FetchError> {
        self.release.notified().await;
        Ok(Vec::new())
    }
}

fn record(hash: &str, sats: i64, time: Option<&str>) -> RawTransactionRecord {
    RawTransactionRecord {
        hash: Some(hash.to_string()),
        balance_change: Some(sats),
        time: time.map(str::to_string),
        block_time: None,
    }
}

fn service(
    store: &Arc<MemoryStore>,
    fetcher: Arc<dyn TransactionFetcher>,
    batch_size: i64,
) -> SyncService {
    SyncService::new(store.clone(), store.clone(), fetcher).with_batch_size(batch_size)
}

#[tokio::test]
async fn empty_first_page_is_success() {
    let (store, id) = MemoryStore::with_address("bc1empty");
    let fetcher = ScriptedFetcher::new(vec![Ok(Vec::new())]);
    let engine = service(&store, fetcher, 100);

    let summary = engine.sync_address(&id).await.unwrap();

    assert_eq!(summary.new_transactions, 0);
    assert_eq!(summary.last_synced_offset, 0);
    assert_eq!(summary.balance, Decimal::ZERO);
    let address = store.address(&id);
    assert_eq!(address.sync_status, SyncStatus::Done);
    assert!(address.last_synced_at.is_some());
}

#[tokio::test]
async fn short_page_advances_offset_by_page_length() {
    let (store, id) = MemoryStore::with_address("bc1offsets");
    let fetcher = ScriptedFetcher::new(vec![
        Ok(vec![record("tx1", 10, None), record("tx2", 20, None)]),
        Ok(vec![record("tx3", 30, None)]),
    ]);
    let engine = service(&store, fetcher.clone(), 100);

    let first = engine.sync_address(&id).await.unwrap();
    assert_eq!(first.last_synced_offset, 2);
    assert_eq!(store.address(&id).last_synced_offset, 2);

    let second = engine.sync_address(&id).await.unwrap();
    assert_eq!(second.last_synced_offset, 3);
    assert_eq!(fetcher.seen_offsets(), vec![0, 2]);
}

#[tokio::test]
async fn full_pages_keep_looping_until_exhaustion() {
    let (store, id) = MemoryStore::with_address("bc1pages");
    let fetcher = ScriptedFetcher::new(vec![
        Ok(vec![record("tx1", 1, None), record("tx2", 2, None)]),
        Ok(vec![record("tx3", 3, None), record("tx4", 4, None)]),
        Ok(Vec::new()),
    ]);
    let engine = service(&store, fetcher.clone(), 2);

    let summary = engine.sync_address(&id).await.unwrap();

    assert_eq!(summary.new_transactions, 4);
    assert_eq!(summary.last_synced_offset, 4);
    assert_eq!(fetcher.seen_offsets(), vec![0, 2, 4]);
}

#[tokio::test]
async fn resumed_run_skips_already_inserted_transactions() {
    let (store, id) = MemoryStore::with_address("bc1resume");
    // tx1 landed in a prior run that crashed before finalizing; the retry
    // re-fetches the same page.
    store.seed_transaction(&id, "tx1", dec!(0.0001));
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![
        record("tx1", 10_000, None),
        record("tx2", 20_000, None),
    ])]);
    let engine = service(&store, fetcher, 100);

    let summary = engine.sync_address(&id).await.unwrap();

    assert_eq!(summary.new_transactions, 1);
    assert_eq!(store.count_for_address(&id).unwrap(), 2);
    assert_eq!(store.address(&id).balance, dec!(0.0003));
}

#[tokio::test]
async fn duplicate_hash_within_one_page_is_inserted_once() {
    let (store, id) = MemoryStore::with_address("bc1dup");
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![
        record("tx1", 100, None),
        record("tx1", 100, None),
        record("tx2", 200, None),
    ])]);
    let engine = service(&store, fetcher, 100);

    let summary = engine.sync_address(&id).await.unwrap();

    assert_eq!(summary.new_transactions, 2);
    assert_eq!(store.count_for_address(&id).unwrap(), 2);
}

#[tokio::test]
async fn records_without_hash_are_skipped() {
    let (store, id) = MemoryStore::with_address("bc1nohash");
    let hashless = RawTransactionRecord {
        hash: None,
        balance_change: Some(999),
        time: None,
        block_time: None,
    };
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![hashless, record("tx1", 10_000, None)])]);
    let engine = service(&store, fetcher, 100);

    let summary = engine.sync_address(&id).await.unwrap();

    assert_eq!(summary.new_transactions, 1);
    assert_eq!(store.address(&id).balance, dec!(0.0001));
}

#[tokio::test]
async fn cross_run_accumulation_preserves_prior_transactions() {
    let (store, id) = MemoryStore::with_address("bc1accum");
    let fetcher = ScriptedFetcher::new(vec![
        Ok(vec![record("tx1", 10_000, None), record("tx2", -5_000, None)]),
        Ok(vec![record("tx3", 20_000, None)]),
    ]);
    let engine = service(&store, fetcher, 100);

    let first = engine.sync_address(&id).await.unwrap();
    assert_eq!(first.balance, dec!(0.00005));
    assert_eq!(store.address(&id).balance, dec!(0.00005));

    let second = engine.sync_address(&id).await.unwrap();
    assert_eq!(second.balance, dec!(0.00025));
    assert_eq!(store.count_for_address(&id).unwrap(), 3);
    assert!(store.exists_by_hash(&id, "tx1").unwrap());
    assert!(store.exists_by_hash(&id, "tx2").unwrap());
}

#[tokio::test]
async fn opposing_dust_amounts_settle_to_exact_zero() {
    let (store, id) = MemoryStore::with_address("bc1dust");
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![
        record("tx1", 100, None),
        record("tx2", -100, None),
    ])]);
    let engine = service(&store, fetcher, 100);

    let summary = engine.sync_address(&id).await.unwrap();

    assert_eq!(summary.balance, Decimal::ZERO);
    assert_eq!(store.address(&id).balance, Decimal::ZERO);
}

#[tokio::test]
async fn successful_run_transitions_through_in_progress_to_done() {
    let (store, id) = MemoryStore::with_address("bc1status");
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![record("tx1", 1, None)])]);
    let engine = service(&store, fetcher, 100);

    engine.sync_address(&id).await.unwrap();

    assert_eq!(
        store.statuses(),
        vec![SyncStatus::InProgress, SyncStatus::Done]
    );
}

#[tokio::test]
async fn fetch_error_persists_error_status_before_propagating() {
    let (store, id) = MemoryStore::with_address("bc1fetchfail");
    let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Transport(
        "connection refused".to_string(),
    ))]);
    let engine = service(&store, fetcher, 100);

    let err = engine.sync_address(&id).await.unwrap_err();

    assert!(matches!(err, Error::Fetch(_)));
    assert_eq!(store.address(&id).sync_status, SyncStatus::Error);
    assert_eq!(
        store.statuses(),
        vec![SyncStatus::InProgress, SyncStatus::Error]
    );
}

#[tokio::test]
async fn store_failure_persists_error_status_before_propagating() {
    let (store, id) = MemoryStore::with_address("bc1storefail");
    store.fail_inserts.store(true, Ordering::SeqCst);
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![record("tx1", 1, None)])]);
    let engine = service(&store, fetcher, 100);

    let err = engine.sync_address(&id).await.unwrap_err();

    assert!(matches!(err, Error::Unexpected(_)));
    assert_eq!(store.address(&id).sync_status, SyncStatus::Error);
}

#[tokio::test]
async fn unknown_address_fails_without_status_writes() {
    let (store, _id) = MemoryStore::with_address("bc1known");
    let fetcher = ScriptedFetcher::new(vec![]);
    let engine = service(&store, fetcher, 100);

    let err = engine.sync_address("missing").await.unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(store.statuses().is_empty());
}

#[tokio::test]
async fn concurrent_run_for_same_address_is_rejected() {
    let (store, id) = MemoryStore::with_address("bc1lock");
    let fetcher = Arc::new(BlockingFetcher {
        release: Notify::new(),
    });
    let engine = Arc::new(service(&store, fetcher.clone(), 100));

    let held = {
        let engine = engine.clone();
        let id = id.clone();
        tokio::spawn(async move { engine.sync_address(&id).await })
    };
    // Let the first run reach the blocked fetch.
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let err = engine.sync_address(&id).await.unwrap_err();
    assert!(matches!(err, Error::SyncInProgress(_)));

    fetcher.release.notify_one();
    held.await.unwrap().unwrap();
    assert_eq!(store.address(&id).sync_status, SyncStatus::Done);
}

#[tokio::test]
async fn permit_admission_rejects_synchronously_while_a_run_is_in_flight() {
    let (store, id) = MemoryStore::with_address("bc1permit");
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![record("tx1", 1, None)])]);
    let engine = service(&store, fetcher, 100);

    // A dispatcher claims the permit before handing the run to a background
    // task; a second trigger must fail here, not inside the task.
    let permit = engine.try_begin(&id).expect("first claim");
    let err = engine.try_begin(&id).unwrap_err();
    assert!(matches!(err, Error::SyncInProgress(_)));

    let summary = engine.sync_with_permit(&id, permit).await.unwrap();
    assert_eq!(summary.new_transactions, 1);
    assert_eq!(store.address(&id).sync_status, SyncStatus::Done);

    // The terminal state releases the lock for the next trigger.
    engine.try_begin(&id).expect("reclaim after completion");
}

#[tokio::test]
async fn overview_listing_reports_counts_from_the_listed_rows() {
    let (store, first_id) = MemoryStore::with_address("bc1one");
    let second = store
        .insert_new_address(NewAddress {
            address: "bc1two".to_string(),
        })
        .await
        .unwrap();
    store.seed_transaction(&first_id, "tx1", dec!(0.0001));
    store.seed_transaction(&first_id, "tx2", dec!(0.0002));

    let addresses = AddressService::new(store.clone(), store.clone());
    let mut overviews = addresses.list_address_overviews().unwrap();
    overviews.sort_by(|a, b| a.address.cmp(&b.address));
    assert_eq!(overviews.len(), 2);
    assert_eq!(overviews[0].transaction_count, 2);
    assert_eq!(overviews[1].transaction_count, 0);

    addresses.delete_address(&second.id).await.unwrap();
    let remaining = addresses.list_address_overviews().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, first_id);
}

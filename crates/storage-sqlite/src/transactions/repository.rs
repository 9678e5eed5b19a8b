use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use cointrack_core::transactions::{NewTransaction, Transaction, TransactionRepositoryTrait};
use cointrack_core::Result;

use super::model::{format_block_time, TransactionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::transactions;

pub struct TransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        TransactionRepository { pool, writer }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    fn exists_by_hash(&self, address_id: &str, tx_hash: &str) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        let found = transactions::table
            .filter(transactions::address_id.eq(address_id))
            .filter(transactions::tx_hash.eq(tx_hash))
            .select(transactions::id)
            .first::<String>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(found.is_some())
    }

    fn count_for_address(&self, address_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = transactions::table
            .filter(transactions::address_id.eq(address_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }

    fn sum_amounts(&self, address_id: &str) -> Result<Decimal> {
        // Amounts are stored as decimal text to keep 8-digit precision, so
        // the sum is computed here rather than with a SQL aggregate.
        let mut conn = get_connection(&self.pool)?;
        let amounts = transactions::table
            .filter(transactions::address_id.eq(address_id))
            .select(transactions::amount)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(amounts
            .iter()
            .filter_map(|value| Decimal::from_str(value).ok())
            .sum())
    }

    fn list_paginated(
        &self,
        address_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::address_id.eq(address_id))
            .order(transactions::timestamp.desc())
            .offset(offset)
            .limit(limit)
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    async fn insert_batch(&self, new_transactions: Vec<NewTransaction>) -> Result<usize> {
        if new_transactions.is_empty() {
            return Ok(0);
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let now = Utc::now().to_rfc3339();
                let rows = new_transactions
                    .into_iter()
                    .map(|new_tx| TransactionDB {
                        id: Uuid::new_v4().to_string(),
                        address_id: new_tx.address_id,
                        tx_hash: new_tx.tx_hash,
                        amount: new_tx.amount.to_string(),
                        timestamp: format_block_time(new_tx.timestamp),
                        created_at: now.clone(),
                    })
                    .collect::<Vec<_>>();

                let inserted = diesel::insert_into(transactions::table)
                    .values(&rows)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(inserted)
            })
            .await
    }
}

//! Blockchair dashboard client for Bitcoin address transaction history.
//!
//! Uses offset-based pagination against the paid dashboards endpoint. One
//! request returns up to `limit` transaction records starting at `offset`;
//! an empty list means the address has no records at or past that offset.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use cointrack_core::sync::{FetchError, RawTransactionRecord, TransactionFetcher};

pub const DEFAULT_API_BASE_URL: &str = "https://api.blockchair.com/bitcoin";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    #[serde(default)]
    data: HashMap<String, AddressDashboard>,
}

#[derive(Debug, Deserialize)]
struct AddressDashboard {
    #[serde(default)]
    transactions: Vec<RawTransactionRecord>,
}

/// Fetcher backed by the Blockchair dashboards API.
#[derive(Debug, Clone)]
pub struct BlockchairFetcher {
    client: Client,
    base_url: String,
}

impl BlockchairFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn dashboard_url(&self, address: &str, offset: i64, limit: i64) -> String {
        format!(
            "{}/dashboards/address/{}?limit={}&offset={}&transaction_details=true",
            self.base_url, address, limit, offset
        )
    }
}

impl Default for BlockchairFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

#[async_trait]
impl TransactionFetcher for BlockchairFetcher {
    async fn fetch_page(
        &self,
        address: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RawTransactionRecord>, FetchError> {
        let url = self.dashboard_url(address, offset, limit);
        debug!("Fetching explorer page: offset={} limit={}", offset, limit);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body: DashboardResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        // An address missing from the payload carries no records; that is
        // exhaustion, not an error.
        Ok(body
            .data
            .into_iter()
            .find(|(key, _)| key == address)
            .map(|(_, dashboard)| dashboard.transactions)
            .unwrap_or_default())
    }
}

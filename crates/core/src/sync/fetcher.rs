//! Pagination fetch contract consumed by the sync engine.

use async_trait::async_trait;
use thiserror::Error;

use super::RawTransactionRecord;

/// Errors surfaced by a fetcher implementation.
///
/// Transport and decode failures are typed instead of degrading to an empty
/// page, so the engine can tell "no more data" apart from "the explorer is
/// down" and fault the run on the latter.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Explorer returned HTTP {status}")]
    Status { status: u16 },

    #[error("Failed to decode explorer response: {0}")]
    Decode(String),
}

/// One page of raw transaction records at `offset`, at most `limit` long.
/// An empty page means true exhaustion: there is nothing at or past `offset`.
#[async_trait]
pub trait TransactionFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        address: &str,
        offset: i64,
        limit: i64,
    ) -> std::result::Result<Vec<RawTransactionRecord>, FetchError>;
}

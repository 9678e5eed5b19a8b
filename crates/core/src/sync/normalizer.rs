//! Converts raw explorer records into normalized transaction candidates.
//!
//! Every malformed input degrades to a default or null value; nothing here
//! aborts a page.

use chrono::NaiveDateTime;
use log::debug;
use rust_decimal::Decimal;

use super::{RawTransactionRecord, TransactionCandidate};

/// Upstream block time format.
pub const BLOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fractional digits between the smallest unit and the principal unit.
const SMALLEST_UNIT_SCALE: u32 = 8;

/// Normalizes one raw record, or rejects it.
///
/// A record without a hash cannot be deduplicated or referenced, so it is
/// silently discarded. A missing amount defaults to zero and an absent or
/// unparseable time yields a null timestamp; both still produce a candidate.
pub fn normalize_record(raw: &RawTransactionRecord) -> Option<TransactionCandidate> {
    let tx_hash = match raw.hash.as_deref() {
        Some(hash) if !hash.is_empty() => hash.to_string(),
        _ => {
            debug!("Discarding explorer record without a hash");
            return None;
        }
    };

    Some(TransactionCandidate {
        tx_hash,
        amount: parse_amount(raw),
        timestamp: parse_timestamp(raw),
    })
}

/// Smallest-unit integer to principal units (divide by 10^8).
fn parse_amount(raw: &RawTransactionRecord) -> Decimal {
    Decimal::new(raw.balance_change.unwrap_or(0), SMALLEST_UNIT_SCALE)
}

fn parse_timestamp(raw: &RawTransactionRecord) -> Option<NaiveDateTime> {
    let value = raw.time.as_deref().or(raw.block_time.as_deref())?;
    NaiveDateTime::parse_from_str(value, BLOCK_TIME_FORMAT).ok()
}

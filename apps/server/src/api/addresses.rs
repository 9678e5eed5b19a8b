//! REST endpoints for tracked addresses and their transactions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use cointrack_core::addresses::{AddressOverview, NewAddress};
use cointrack_core::transactions::Transaction;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addresses", post(register_address).get(list_addresses))
        .route("/addresses/lookup", get(lookup_address))
        .route("/addresses/:id", get(get_address).delete(delete_address))
        .route("/addresses/:id/sync", post(trigger_sync))
        .route("/addresses/:id/transactions", get(list_transactions))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterAddressRequest {
    address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterAddressResponse {
    id: String,
    address: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    id: String,
    address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncTriggeredResponse {
    status: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TransactionsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionView {
    id: String,
    tx_hash: String,
    amount: Decimal,
    timestamp: Option<NaiveDateTime>,
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        TransactionView {
            id: tx.id,
            tx_hash: tx.tx_hash,
            amount: tx.amount,
            timestamp: tx.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionListResponse {
    id: String,
    address: String,
    limit: i64,
    offset: i64,
    total_transactions: i64,
    transactions: Vec<TransactionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn register_address(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAddressRequest>,
) -> ApiResult<(StatusCode, Json<RegisterAddressResponse>)> {
    if payload.address.trim().is_empty() {
        return Err(ApiError::BadRequest("address must not be empty".to_string()));
    }

    let created = state
        .address_service
        .register_address(NewAddress {
            address: payload.address.trim().to_string(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAddressResponse {
            id: created.id,
            address: created.address,
            created_at: created.created_at,
        }),
    ))
}

async fn list_addresses(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AddressOverview>>> {
    Ok(Json(state.address_service.list_address_overviews()?))
}

async fn lookup_address(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<LookupResponse>> {
    let address = state.address_service.lookup_by_address(&query.address)?;
    Ok(Json(LookupResponse {
        id: address.id,
        address: address.address,
    }))
}

async fn get_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AddressOverview>> {
    Ok(Json(state.address_service.get_address_overview(&id)?))
}

/// Claims the address's run permit (409 when a run is already in flight),
/// flips the address to IN_PROGRESS synchronously, then runs the sync in the
/// background. Returns before the run completes; progress and failure are
/// observable only by polling the address's status.
async fn trigger_sync(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<SyncTriggeredResponse>)> {
    let permit = state.sync_service.try_begin(&id)?;
    state.address_service.mark_sync_in_progress(&id).await?;

    let sync_service = state.sync_service.clone();
    let address_id = id.clone();
    tokio::spawn(async move {
        match sync_service.sync_with_permit(&address_id, permit).await {
            Ok(summary) => info!(
                "Background sync finished for address {}: {} new transactions",
                address_id, summary.new_transactions
            ),
            // The run already persisted the ERROR status; logging is all
            // that is left to do here.
            Err(err) => error!("Background sync failed for address {}: {}", address_id, err),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncTriggeredResponse {
            status: "accepted".to_string(),
            message: format!("Sync triggered for address {}", id),
        }),
    ))
}

async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<TransactionListResponse>> {
    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);
    if limit <= 0 {
        return Err(ApiError::BadRequest("limit must be positive".to_string()));
    }
    if offset < 0 {
        return Err(ApiError::BadRequest("offset must not be negative".to_string()));
    }

    let address = state.address_service.get_address(&id)?;
    let page = state
        .transaction_service
        .list_for_address(&address.id, limit, offset)?;

    Ok(Json(TransactionListResponse {
        id: address.id,
        address: address.address,
        limit: page.limit,
        offset: page.offset,
        total_transactions: page.total_transactions,
        transactions: page.transactions.into_iter().map(TransactionView::from).collect(),
    }))
}

async fn delete_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    state.address_service.delete_address(&id).await?;
    Ok(Json(DeleteResponse {
        message: format!("Address {} deleted", id),
    }))
}

//! cointrack server binary: wires storage, the explorer client and the
//! domain services, then serves the REST API.

mod api;
mod error;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cointrack_core::addresses::AddressService;
use cointrack_core::sync::SyncService;
use cointrack_core::transactions::TransactionService;
use cointrack_explorer::{BlockchairFetcher, DEFAULT_API_BASE_URL};
use cointrack_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, AddressRepository, TransactionRepository,
};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir =
        std::env::var("COINTRACK_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let port: u16 = std::env::var("COINTRACK_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("COINTRACK_PORT must be a valid port number")?;
    let api_base_url = std::env::var("BLOCKCHAIR_API_URL")
        .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

    let db_path = init(&data_dir).context("Failed to prepare the data directory")?;
    run_migrations(&db_path).context("Failed to run database migrations")?;
    let pool = create_pool(&db_path).context("Failed to create the connection pool")?;
    let writer = spawn_writer(pool.as_ref().clone());

    let address_repository = Arc::new(AddressRepository::new(pool.clone(), writer.clone()));
    let transaction_repository = Arc::new(TransactionRepository::new(pool.clone(), writer));
    let fetcher = Arc::new(BlockchairFetcher::new(api_base_url));

    let state = AppState {
        address_service: Arc::new(AddressService::new(
            address_repository.clone(),
            transaction_repository.clone(),
        )),
        transaction_service: Arc::new(TransactionService::new(
            address_repository.clone(),
            transaction_repository.clone(),
        )),
        sync_service: Arc::new(SyncService::new(
            address_repository,
            transaction_repository,
            fetcher,
        )),
    };

    let app = api::router().with_state(state);

    let bind_address = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Could not bind TCP listener to {}", bind_address))?;
    info!("cointrack server listening on {}", bind_address);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

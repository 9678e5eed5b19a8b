//! Shared handler state: the wired domain services.

use std::sync::Arc;

use cointrack_core::addresses::AddressServiceTrait;
use cointrack_core::sync::SyncServiceTrait;
use cointrack_core::transactions::TransactionServiceTrait;

#[derive(Clone)]
pub struct AppState {
    pub address_service: Arc<dyn AddressServiceTrait>,
    pub transaction_service: Arc<dyn TransactionServiceTrait>,
    pub sync_service: Arc<dyn SyncServiceTrait>,
}

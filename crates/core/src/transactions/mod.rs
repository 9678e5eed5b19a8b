//! Transaction domain models and services.

mod transactions_model;
mod transactions_repository;
mod transactions_service;

pub use transactions_model::*;
pub use transactions_repository::*;
pub use transactions_service::*;

//! Tracked address domain models and services.

mod addresses_model;
mod addresses_repository;
mod addresses_service;

pub use addresses_model::*;
pub use addresses_repository::*;
pub use addresses_service::*;

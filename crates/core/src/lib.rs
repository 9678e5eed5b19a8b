//! Core domain logic for cointrack: tracked addresses, their transactions,
//! and the incremental block-explorer synchronization engine.
//!
//! Persistence and HTTP are behind traits; implementations live in the
//! `cointrack-storage-sqlite` and `cointrack-explorer` crates.

pub mod addresses;
pub mod errors;
pub mod sync;
pub mod transactions;

pub use errors::{Error, Result};

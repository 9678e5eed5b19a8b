//! SQLite persistence for cointrack, built on diesel with an r2d2 read pool
//! and a single serialized writer.

pub mod addresses;
pub mod db;
pub mod errors;
pub mod schema;
pub mod transactions;

pub use addresses::AddressRepository;
pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, DbPool, WriteHandle};
pub use errors::StorageError;
pub use transactions::TransactionRepository;

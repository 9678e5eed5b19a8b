//! SQLite storage for stored transactions.

mod model;
mod repository;

pub use model::TransactionDB;
pub use repository::TransactionRepository;

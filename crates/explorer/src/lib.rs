//! Block-explorer clients implementing the core pagination fetch contract.

mod blockchair;

pub use blockchair::{BlockchairFetcher, DEFAULT_API_BASE_URL};

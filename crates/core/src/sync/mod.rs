//! Incremental synchronization: the fetch contract, record normalization and
//! the engine driving the fetch-normalize-dedup-persist loop.

mod fetcher;
mod normalizer;
mod sync_model;
mod sync_service;

pub use fetcher::*;
pub use normalizer::*;
pub use sync_model::*;
pub use sync_service::*;

#[cfg(test)]
mod tests;

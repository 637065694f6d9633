//! Store error types and the resolution-chain seam
//!
//! `FandomIndex` is the narrow interface resolution tier 1 consumes; it
//! is a trait so chain tests can substitute fixtures for the SQLite
//! store.

use crate::store::FandomAggregates;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Work not found: {0}")]
    WorkNotFound(i64),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to persisted fandom aggregates
///
/// Returns `Ok(None)` when no fandom matches the name or the matched
/// fandom has no associated works; both mean the tier produced nothing.
pub trait FandomIndex {
    fn fandom_aggregates(&self, name: &str) -> StoreResult<Option<FandomAggregates>>;
}

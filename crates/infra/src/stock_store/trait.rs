use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use storefront_core::ExpectedVersion;
use storefront_inventory::{Sku, StockMovement, StockRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored version no longer matches the caller's expectation.
    #[error("optimistic concurrency conflict: {0}")]
    Concurrency(String),

    /// Backend could not be reached or timed out. Safe to retry the whole request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused or returned data that violates a stock invariant.
    #[error("store rejected data: {0}")]
    Rejected(String),
}

/// Persistence boundary for stock records and their movement ledger.
///
/// ## Commit semantics
///
/// `commit()` writes the record's new state and appends its movements as one
/// atomic unit, and only if the stored version equals `expected`:
/// - `ExpectedVersion::Exact(0)` means "the record must not exist yet"
/// - a mismatch yields `StoreError::Concurrency` and nothing is written
///
/// Read-modify-write callers reload and retry on `Concurrency`.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Load one record by SKU.
    async fn load(&self, sku: &Sku) -> Result<Option<StockRecord>, StoreError>;

    /// All records ordered by SKU.
    async fn list(&self) -> Result<Vec<StockRecord>, StoreError>;

    /// Atomically persist `record` and append `movements` (see trait docs).
    async fn commit(
        &self,
        record: &StockRecord,
        expected: ExpectedVersion,
        movements: &[StockMovement],
    ) -> Result<(), StoreError>;

    /// Ledger entries for a SKU, newest first, at most `limit`.
    async fn movements(&self, sku: &Sku, limit: usize) -> Result<Vec<StockMovement>, StoreError>;
}

#[async_trait]
impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    async fn load(&self, sku: &Sku) -> Result<Option<StockRecord>, StoreError> {
        (**self).load(sku).await
    }

    async fn list(&self) -> Result<Vec<StockRecord>, StoreError> {
        (**self).list().await
    }

    async fn commit(
        &self,
        record: &StockRecord,
        expected: ExpectedVersion,
        movements: &[StockMovement],
    ) -> Result<(), StoreError> {
        (**self).commit(record, expected, movements).await
    }

    async fn movements(&self, sku: &Sku, limit: usize) -> Result<Vec<StockMovement>, StoreError> {
        (**self).movements(sku, limit).await
    }
}

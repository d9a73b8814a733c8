//! Stock mutation pipeline.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load record by SKU (or an empty record for creation)
//!   ↓
//! 2. Handle command (pure decision logic, produces events)
//!   ↓
//! 3. Apply events (status re-classified, version + 1)
//!   ↓
//! 4. Commit record + ledger entries, guarded by the loaded version
//!   ↓
//! 5. On a version conflict, go back to 1 (bounded attempts)
//! ```
//!
//! Concurrent adjustments of one SKU therefore never lose an update: the
//! loser of a race re-reads the winner's quantity and re-decides.

use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, MovementId};
use storefront_inventory::{
    AdjustStock, CreateRecord, Direction, SetThreshold, Sku, StockCommand, StockEvent,
    StockMovement, StockRecord,
};

use crate::stock_store::{StockStore, StoreError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_MOVEMENT_LIMIT: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("stock record not found")]
    NotFound,

    /// Caller error: bad quantity, SKU or direction.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A removal exceeded the quantity on hand.
    #[error("{0}")]
    InsufficientStock(String),

    /// Duplicate creation, or optimistic retries exhausted.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage is down; the whole request may be retried.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Storage returned or refused data in a way that should not happen.
    #[error("storage error: {0}")]
    Internal(String),
}

impl From<DomainError> for StockError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                StockError::InvalidArgument(msg)
            }
            e @ DomainError::InsufficientStock { .. } => StockError::InsufficientStock(e.to_string()),
            DomainError::NotFound => StockError::NotFound,
            DomainError::Conflict(msg) => StockError::Conflict(msg),
        }
    }
}

impl From<StoreError> for StockError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => StockError::Conflict(msg),
            StoreError::Unavailable(msg) => StockError::Unavailable(msg),
            StoreError::Rejected(msg) => StockError::Internal(msg),
        }
    }
}

/// Result of a successful adjustment: the new record state and its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub record: StockRecord,
    pub movement: StockMovement,
}

/// Stock record service over any [`StockStore`].
#[derive(Debug)]
pub struct StockService<S> {
    store: S,
    max_attempts: u32,
}

impl<S> StockService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Bound the optimistic read-modify-write loop (at least one attempt).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> StockService<S>
where
    S: StockStore,
{
    /// Create a stock record for a newly stocked product.
    pub async fn create(
        &self,
        sku: Sku,
        quantity: u64,
        low_stock_threshold: u64,
        now: DateTime<Utc>,
    ) -> Result<StockRecord, StockError> {
        let cmd = StockCommand::CreateRecord(CreateRecord {
            sku: sku.clone(),
            quantity,
            low_stock_threshold,
            occurred_at: now,
        });
        let (record, _) = self.execute(&sku, cmd).await?;
        tracing::info!(
            sku = %record.sku(),
            quantity = record.quantity_on_hand(),
            status = %record.status(),
            "stock record created"
        );
        Ok(record)
    }

    /// Apply a receipt or removal to a record.
    pub async fn adjust(
        &self,
        sku: Sku,
        quantity: u64,
        direction: Direction,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Adjustment, StockError> {
        let cmd = StockCommand::AdjustStock(AdjustStock {
            sku: sku.clone(),
            movement_id: MovementId::new(),
            quantity,
            direction,
            reason,
            occurred_at: now,
        });
        let (record, events) = self.execute(&sku, cmd).await?;

        let movement = events
            .into_iter()
            .find_map(|e| match e {
                StockEvent::StockAdjusted(m) => Some(m),
                _ => None,
            })
            .ok_or_else(|| StockError::Internal("adjustment produced no movement".to_string()))?;

        tracing::info!(
            sku = %record.sku(),
            direction = %movement.direction,
            quantity = movement.quantity,
            on_hand = record.quantity_on_hand(),
            status = %record.status(),
            version = record.version(),
            "stock adjusted"
        );
        Ok(Adjustment { record, movement })
    }

    /// Change the reorder threshold; status is re-derived.
    pub async fn set_threshold(
        &self,
        sku: Sku,
        low_stock_threshold: u64,
        now: DateTime<Utc>,
    ) -> Result<StockRecord, StockError> {
        let cmd = StockCommand::SetThreshold(SetThreshold {
            sku: sku.clone(),
            low_stock_threshold,
            occurred_at: now,
        });
        let (record, _) = self.execute(&sku, cmd).await?;
        tracing::info!(
            sku = %record.sku(),
            threshold = record.low_stock_threshold(),
            status = %record.status(),
            "low-stock threshold changed"
        );
        Ok(record)
    }

    pub async fn get(&self, sku: &Sku) -> Result<StockRecord, StockError> {
        self.store.load(sku).await?.ok_or(StockError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<StockRecord>, StockError> {
        Ok(self.store.list().await?)
    }

    /// Records an operator should act on: low or out of stock.
    pub async fn list_attention(&self) -> Result<Vec<StockRecord>, StockError> {
        let mut records = self.store.list().await?;
        records.retain(|r| r.status().needs_attention());
        Ok(records)
    }

    /// Movement ledger for one SKU, newest first.
    pub async fn movements(&self, sku: &Sku, limit: usize) -> Result<Vec<StockMovement>, StockError> {
        // Distinguish "no movements yet" from "no such record".
        self.get(sku).await?;
        Ok(self.store.movements(sku, limit).await?)
    }

    async fn execute(
        &self,
        sku: &Sku,
        command: StockCommand,
    ) -> Result<(StockRecord, Vec<StockEvent>), StockError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut record = self
                .store
                .load(sku)
                .await?
                .unwrap_or_else(|| StockRecord::empty(sku.clone()));
            let expected = ExpectedVersion::read_at(record.version());

            let events = record.handle(&command)?;
            for e in &events {
                record.apply(e);
            }

            let movements: Vec<StockMovement> = events
                .iter()
                .filter_map(|e| match e {
                    StockEvent::StockAdjusted(m) => Some(m.clone()),
                    _ => None,
                })
                .collect();

            match self.store.commit(&record, expected, &movements).await {
                Ok(()) => return Ok((record, events)),
                Err(StoreError::Concurrency(msg)) if attempt < self.max_attempts => {
                    tracing::debug!(sku = %sku, attempt, "stock write raced, retrying: {msg}");
                }
                Err(StoreError::Concurrency(msg)) => {
                    tracing::warn!(sku = %sku, attempt, "giving up after repeated write conflicts");
                    return Err(StockError::Conflict(msg));
                }
                Err(e) => {
                    tracing::warn!(sku = %sku, "stock commit failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }
}

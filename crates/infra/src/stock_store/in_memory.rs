use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use storefront_core::{AggregateRoot, ExpectedVersion};
use storefront_inventory::{Sku, StockMovement, StockRecord};

use super::r#trait::{StockStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<Sku, StockRecord>,
    ledger: HashMap<Sku, Vec<StockMovement>>,
}

/// In-memory stock store.
///
/// Intended for tests/dev. The version check and the write happen under one
/// write lock, so commits are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage: every call fails with `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn load(&self, sku: &Sku) -> Result<Option<StockRecord>, StoreError> {
        self.ensure_online()?;
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.records.get(sku).cloned())
    }

    async fn list(&self) -> Result<Vec<StockRecord>, StoreError> {
        self.ensure_online()?;
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.records.values().cloned().collect())
    }

    async fn commit(
        &self,
        record: &StockRecord,
        expected: ExpectedVersion,
        movements: &[StockMovement],
    ) -> Result<(), StoreError> {
        self.ensure_online()?;

        if let Some((idx, _)) = movements.iter().enumerate().find(|(_, m)| &m.sku != record.sku()) {
            return Err(StoreError::Rejected(format!(
                "movement at index {idx} belongs to a different sku"
            )));
        }

        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let current = inner.records.get(record.sku()).map(|r| r.version()).unwrap_or(0);

        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        inner.records.insert(record.sku().clone(), record.clone());
        if !movements.is_empty() {
            inner
                .ledger
                .entry(record.sku().clone())
                .or_default()
                .extend(movements.iter().cloned());
        }

        Ok(())
    }

    async fn movements(&self, sku: &Sku, limit: usize) -> Result<Vec<StockMovement>, StoreError> {
        self.ensure_online()?;
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .ledger
            .get(sku)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use storefront_auth::{AdminAccount, normalize_email};

use crate::stock_store::StoreError;

/// Persistence boundary for admin accounts, keyed by normalized email.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, StoreError>;
    async fn save(&self, account: &AdminAccount) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn save(&self, account: &AdminAccount) -> Result<(), StoreError> {
        (**self).save(account).await
    }
}

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<HashMap<String, AdminAccount>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = AdminAccount>) -> Self {
        let map = accounts
            .into_iter()
            .map(|a| (normalize_email(&a.email), a))
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(&normalize_email(email)).cloned())
    }

    async fn save(&self, account: &AdminAccount) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        map.insert(normalize_email(&account.email), account.clone());
        Ok(())
    }
}

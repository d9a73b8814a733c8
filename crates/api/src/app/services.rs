use std::sync::Arc;

use anyhow::Context;

use storefront_auth::{AdminAccount, Hs256JwtIssuer, Role};
use storefront_infra::StockService;
use storefront_infra::accounts::{AccountStore, InMemoryAccountStore, LoginService};
use storefront_infra::stock_store::{InMemoryStockStore, PostgresStockStore, StockStore};

use crate::config::AppConfig;

/// Services shared by every handler (behind `Extension<Arc<AppServices>>`).
pub struct AppServices {
    pub stock: StockService<Arc<dyn StockStore>>,
    pub login: LoginService<Arc<dyn AccountStore>>,
}

impl AppServices {
    pub fn new(
        config: &AppConfig,
        stock_store: Arc<dyn StockStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            stock: StockService::new(stock_store).with_max_attempts(config.stock_max_attempts),
            login: LoginService::new(
                accounts,
                config.lockout,
                Hs256JwtIssuer::new(config.jwt_secret.as_bytes(), config.jwt_ttl),
            ),
        }
    }
}

/// Wire storage per config: Postgres when `USE_PERSISTENT_STORES` is set,
/// in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let stock_store: Arc<dyn StockStore> = match (config.use_persistent_stores, &config.database_url) {
        (true, Some(url)) => {
            let store = PostgresStockStore::connect(url, config.database_max_connections)
                .await
                .context("connecting to stock database")?;
            store.migrate().await.context("applying stock schema")?;
            tracing::info!("using postgres stock store");
            Arc::new(store)
        }
        _ => {
            tracing::info!("using in-memory stock store");
            Arc::new(InMemoryStockStore::new())
        }
    };

    Ok(AppServices::new(config, stock_store, Arc::new(seed_accounts(config))))
}

/// Seed the single admin account from `ADMIN_EMAIL` / `ADMIN_PASSWORD_HASH`.
pub fn seed_accounts(config: &AppConfig) -> InMemoryAccountStore {
    match (&config.admin_email, &config.admin_password_hash) {
        (Some(email), Some(hash)) => {
            tracing::info!("admin account configured");
            InMemoryAccountStore::with_accounts([AdminAccount::new(
                email,
                hash.clone(),
                vec![Role::ADMIN],
            )])
        }
        _ => {
            tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD_HASH not set; admin login disabled");
            InMemoryAccountStore::new()
        }
    }
}

use anyhow::Context;

use storefront_api::config::{self, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match config::log_format(|key| std::env::var(key).ok()) {
        Ok(Some(format)) => storefront_observability::init_with_format(format),
        Ok(None) => storefront_observability::init(),
        Err(e) => {
            storefront_observability::init();
            return Err(e).context("loading configuration");
        }
    }

    let config = AppConfig::from_env().context("loading configuration")?;
    if config.uses_dev_secret() && config.use_persistent_stores {
        tracing::warn!("persistent stores enabled with the development JWT secret");
    }

    let app = storefront_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

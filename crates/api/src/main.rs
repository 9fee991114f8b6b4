use anyhow::Context;

use tutorhub_api::app::{build_app, services::AppServices};
use tutorhub_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tutorhub_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = AppServices::from_config(config.database.as_ref())
        .await
        .context("failed to initialize store")?;
    let app = build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        store = if config.database.is_some() { "postgres" } else { "in-memory" },
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

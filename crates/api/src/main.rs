use anyhow::Result;
use raksha_api::{build_app_with, ApiConfig};
use raksha_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("raksha_api");

    let config = ApiConfig::from_env();
    let bind = config.bind.clone();

    let app = build_app_with(config)?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "raksha api started");

    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use token_service::config::ServiceConfig;
use token_service::oidc::GoogleProvider;
use token_service::{router, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServiceConfig::from_env()?;
    let addr = config.bind_addr;
    info!(
        allowed_domain = %config.allowed_domain,
        ttl_seconds = config.token_ttl_seconds,
        "loaded token service configuration"
    );

    let provider = Arc::new(GoogleProvider::new(config.oidc.clone()));
    let state = AppState::new(config, provider)?;
    let app = router(state);

    info!(%addr, "starting token-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

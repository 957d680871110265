use anyhow::Context;
use auth_service::{load_service_config, router, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    let addr = config.socket_addr()?;
    let ttl_hours = config.token.ttl.num_hours();

    let state = AppState::in_memory(config)?;
    state
        .seed_bootstrap_admin()
        .await
        .context("Failed to seed bootstrap admin")?;

    let app = router(state);

    info!(%addr, ttl_hours, "starting auth-service");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

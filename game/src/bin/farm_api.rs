use anyhow::{Context, Result};
use tracing::info;

use zombie_farm::api::{AppState, resolve_api_addr, router};
use zombie_farm::config::ConfigStore;
use zombie_farm::editor_api::EditorSession;
use zombie_farm::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let store = ConfigStore::from_env();
    let config = store.load();
    info!(path = %store.path().display(), "config loaded");

    let session = EditorSession::with_config(&config).context("load stage catalog")?;
    let app = router(AppState::new(session));

    let addr = resolve_api_addr(|k| std::env::var(k).ok());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind farm api on {addr}"))?;
    info!("farm api listening on http://{addr}");

    axum::serve(listener, app).await.context("serve farm api")?;
    Ok(())
}

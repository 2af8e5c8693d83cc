// DVF Dashboard - Web Server
//
//   DVF_DATA_PATH  CSV to load            (default: dvf.csv)
//   DVF_BIND       listen address         (default: 0.0.0.0:3000)
//   RUST_LOG       tracing filter         (default: dvf_dashboard=info,dvf_server=info,tower_http=info)

use anyhow::{Context, Result};
use tracing::info;

use dvf_dashboard::api::{create_router, AppState};
use dvf_dashboard::{init_dataset, logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("dvf_dashboard=info,dvf_server=info,tower_http=info");

    let config = Config::from_env()?;

    // Loaded once; every request shares the same &'static table
    let dataset = init_dataset(&config.data_path)
        .with_context(|| format!("Failed to load dataset from {}", config.data_path.display()))?;

    let app = create_router(AppState { dataset });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        version = dvf_dashboard::VERSION,
        "dvf-server listening"
    );

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

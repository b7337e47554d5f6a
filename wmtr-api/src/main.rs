//! wmtr-api - Water-meter reading service
//!
//! Users photograph their water meters; the service stores the image,
//! asks a remote recognition endpoint for the numeric reading, and records
//! either the recognized value or a placeholder pending manual correction.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use wmtr_api::{build_router, ocr::OcrClient, storage::ImageStore, AppState};
use wmtr_common::config::{self, Settings};
use wmtr_common::db::init_database;

#[derive(Parser, Debug)]
#[command(name = "wmtr-api", about = "Water-meter reading service")]
struct Opts {
    /// Data folder (database and stored images)
    #[arg(long)]
    data_root: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber before anything can log
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting wmtr-api v{}", env!("CARGO_PKG_VERSION"));

    let opts = Opts::parse();

    let settings = Settings::load(opts.config.as_deref())?;

    let data_root = config::resolve_data_root(opts.data_root.as_deref(), "WMTR_DATA_ROOT");
    config::ensure_data_root(&data_root)?;
    info!("Data folder: {}", data_root.display());

    let db_path = config::database_path(&data_root);
    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let store = ImageStore::new(data_root, settings.public_base_url.clone());
    let ocr = OcrClient::new(
        settings.ocr_url.clone(),
        Duration::from_secs(settings.ocr_timeout_secs),
    )?;
    info!(
        "Recognition endpoint: {} (timeout {}s)",
        settings.ocr_url, settings.ocr_timeout_secs
    );

    let state = AppState::new(pool, store, ocr);
    let app = build_router(state);

    let bind_addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("wmtr-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

mod app;
mod forms;

use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use anyhow::{Context, Result};
use meeple_core::{
    config::{self, AppConfig},
    lookup::Lookup,
    CollectionStore,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;
    info!(
        config = %config_path.display(),
        data_dir = %config.data_dir.display(),
        "Starting meeple"
    );

    let store = CollectionStore::open(config.data_dir.clone())
        .with_context(|| format!("failed to open collection in {}", config.data_dir.display()))?;
    let (lookup, lookup_rx) = Lookup::new(&config.lookup).context("failed to build HTTP client")?;

    let mut app = app::MeepleApp::new(store, lookup, config.export.banner_duration());
    app.attach_lookup(lookup_rx);
    app.run().await
}

/// Log to a file only; the terminal belongs to the UI.
fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("meeple.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}

mod bootstrap;
mod health;
mod sweep;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tripdesk_core::config::{AppConfig, LoadOptions};
use tripdesk_db::repositories::SqlApprovalRepository;

fn init_logging(config: &AppConfig) {
    use tripdesk_core::config::LogFormat::*;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Bootstrap reuses the config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let sweeper = sweep::spawn(
        Arc::new(SqlApprovalRepository::new(app.db_pool.clone())),
        app.config.approvals.sweep_interval_secs,
    );

    tracing::info!(
        event_name = "system.server.started",
        supplier_mode = app.config.supplier.mode.as_str(),
        "tripdesk-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(event_name = "system.server.stopping", "tripdesk-server stopping");

    sweeper.abort();
    let drain = app.db_pool.close();
    let deadline = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(deadline, drain).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            "database pool did not drain before the shutdown deadline"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

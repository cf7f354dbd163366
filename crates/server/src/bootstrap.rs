use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use tripdesk_core::config::{AppConfig, ConfigError, LoadOptions, SupplierMode};
use tripdesk_db::repositories::{
    SqlApprovalRepository, SqlBookingRepository, SqlIncidentRepository, SqlInvoiceRepository,
    SqlPolicyRepository, SqlTravelerRepository,
};
use tripdesk_db::{connect_with_settings, migrations, DbPool};
use tripdesk_orchestrator::{
    BookingOrchestrator, DetachedNotifier, LogDelivery, LoggedPreferences, OrchestratorSettings,
    Repositories,
};
use tripdesk_payment::{DisabledPayments, PaymentError, PaymentGateway, RazorpayClient};
use tripdesk_supplier::{
    AerohubBackend, SandboxBackend, SupplierError, SupplierGateway, SupplierRouter,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<BookingOrchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("supplier gateway setup failed: {0}")]
    Supplier(#[source] SupplierError),
    #[error("payment gateway setup failed: {0}")]
    Payment(#[source] PaymentError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let supplier = build_supplier(&config)?;
    let payments = build_payments(&config)?;
    let orchestrator = Arc::new(BookingOrchestrator::new(
        sql_repositories(&db_pool),
        supplier,
        payments,
        Arc::new(DetachedNotifier::new(Arc::new(LogDelivery))),
        Arc::new(LoggedPreferences),
        OrchestratorSettings::from_config(&config),
    ));
    info!(
        event_name = "system.bootstrap.orchestrator_wired",
        supplier_mode = config.supplier.mode.as_str(),
        payments_enabled = config.payment.enabled,
        "booking orchestrator wired"
    );

    Ok(Application { config, db_pool, orchestrator })
}

fn sql_repositories(pool: &DbPool) -> Repositories {
    Repositories {
        bookings: Arc::new(SqlBookingRepository::new(pool.clone())),
        approvals: Arc::new(SqlApprovalRepository::new(pool.clone())),
        policies: Arc::new(SqlPolicyRepository::new(pool.clone())),
        travelers: Arc::new(SqlTravelerRepository::new(pool.clone())),
        invoices: Arc::new(SqlInvoiceRepository::new(pool.clone())),
        incidents: Arc::new(SqlIncidentRepository::new(pool.clone())),
    }
}

/// One backend per process. Live and sandbox are never mounted together so a
/// misconfigured environment cannot quietly fall back to sample inventory.
fn build_supplier(config: &AppConfig) -> Result<Arc<dyn SupplierGateway>, BootstrapError> {
    let router = match config.supplier.mode {
        SupplierMode::Live => SupplierRouter::new(config.pricing.rule()).with_backend(Arc::new(
            AerohubBackend::from_config(&config.supplier).map_err(BootstrapError::Supplier)?,
        )),
        SupplierMode::Sandbox => {
            SupplierRouter::new(config.pricing.rule()).with_backend(Arc::new(SandboxBackend::new()))
        }
    };
    Ok(Arc::new(router))
}

fn build_payments(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>, BootstrapError> {
    if config.payment.enabled {
        let client =
            RazorpayClient::from_config(&config.payment).map_err(BootstrapError::Payment)?;
        Ok(Arc::new(client))
    } else {
        Ok(Arc::new(DisabledPayments))
    }
}

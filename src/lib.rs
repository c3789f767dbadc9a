//! RiceScan API
//!
//! Backend for the rice leaf disease identification app: account signup and
//! login with email verification, password reset and email change via OTP,
//! scan persistence and history, disease reference data, and image uploads.
//! Database access goes through a hand-managed connection pool and query
//! executor rather than a driver-side pool.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use api::state::AppState;
use infrastructure::db::{ConnectPolicy, ConnectionPool, PgDriver, PoolConfig, QueryExecutor};
use infrastructure::email::{LogMailer, Mailer, SmtpMailer};
use infrastructure::object_store::HttpObjectStore;
use infrastructure::scan::{ScanService, SqlScanRepository};
use infrastructure::user::{AccountService, Argon2Hasher, SqlUserRepository};
use infrastructure::verification::VerificationStores;

/// Create the application state with all services initialized
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let database_url = config
        .database_url()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    let driver = PgDriver::new(
        database_url,
        ConnectPolicy {
            connect_timeout: Duration::from_secs(config.database.connect_timeout_secs),
            retries: config.database.connect_retries,
            backoff: Duration::from_millis(config.database.retry_backoff_ms),
        },
    );
    let pool = Arc::new(ConnectionPool::new(
        Arc::new(driver),
        PoolConfig {
            max_size: config.database.max_connections,
            acquire_timeout: Duration::from_secs(config.database.acquire_timeout_secs),
        },
    ));
    let executor = Arc::new(QueryExecutor::new(
        pool,
        Duration::from_secs(config.database.query_timeout_secs),
    ));
    info!(
        max_connections = config.database.max_connections,
        "database pool initialized"
    );

    let mailer: Arc<dyn Mailer> = match SmtpMailer::new(&config.email) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            warn!(error = %e, "SMTP not configured, logging outbound mail instead");
            Arc::new(LogMailer)
        }
    };

    let accounts = AccountService::new(
        Arc::new(SqlUserRepository::new(executor.clone())),
        Arc::new(Argon2Hasher::new()),
        mailer,
        Arc::new(VerificationStores::default()),
        &config.verification,
    );
    let scans = ScanService::new(Arc::new(SqlScanRepository::new(executor.clone())));

    Ok(AppState {
        accounts: Arc::new(accounts),
        scans: Arc::new(scans),
        uploads: Arc::new(HttpObjectStore::new(&config.storage)),
        db: executor,
        scan_bucket: config.storage.scan_bucket.clone(),
        profile_bucket: config.storage.profile_bucket.clone(),
    })
}

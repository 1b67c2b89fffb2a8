use crate::config::EngineConfig;
use crate::context::CallContext;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use migrations::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&EngineConfig> for DbConfig {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool with default tuning.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("inventory_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        ServiceError::db_error(e)
    })?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool using engine configuration
pub async fn establish_connection_from_config(cfg: &EngineConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Applies all pending schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = Migrator::up(pool, None).await.map_err(ServiceError::db_error);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Runs `f` inside a database transaction, committing on `Ok` and rolling
/// back on `Err`. Connection failures surface as `ServiceError::Internal`.
///
/// The body of `f` is raced against `ctx`: cancellation or a missed deadline
/// rolls the transaction back. The commit itself is never interrupted.
pub async fn transaction<F, T>(
    pool: &DbPool,
    label: &'static str,
    ctx: &CallContext,
    f: F,
) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send + 'static,
{
    ctx.check()?;
    let guard = ctx.clone();
    let transaction_id = Uuid::new_v4();
    let start = Instant::now();

    debug!(transaction_id = %transaction_id, label, "Starting database transaction");
    counter!("inventory_db.transaction.started", 1);

    let result = pool
        .transaction::<_, T, ServiceError>(move |txn| {
            let fut = f(txn);
            Box::pin(async move { guard.run(fut).await })
        })
        .await;

    let elapsed = start.elapsed();
    histogram!("inventory_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("inventory_db.transaction.committed", 1);
            debug!(transaction_id = %transaction_id, label, "Transaction committed in {:?}", elapsed);
        }
        Err(sea_orm::TransactionError::Transaction(e)) if e.is_expected() => {
            counter!("inventory_db.transaction.rolled_back", 1);
            debug!(transaction_id = %transaction_id, label, error = %e, "Transaction rolled back");
        }
        Err(e) => {
            counter!("inventory_db.transaction.rolled_back", 1);
            warn!(transaction_id = %transaction_id, label, error = %e, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(ServiceError::from)
}

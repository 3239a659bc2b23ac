//! Named datasources and the registry that owns them.

use crate::advisory_lock::AdvisoryLock;
use crate::config::DatasourceConfig;
use crate::error::{Fault, RunnerError, RunnerResult};
use crate::logger::{DatasourceLogger, TracingLogger};
use crate::pool::{ConnectionPool, PgConnectionPool};
use crate::query::QueryRunner;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// One named Postgres datasource: a connection pool plus the logger shared
/// by every runner created from it.
pub struct Datasource {
    name: String,
    pool: Arc<dyn ConnectionPool>,
    logger: Arc<dyn DatasourceLogger>,
}

impl Datasource {
    /// Open a pooled connection to the configured database.
    pub async fn connect(config: DatasourceConfig) -> RunnerResult<Self> {
        config
            .pool
            .validate()
            .map_err(|msg| RunnerError::Fault(Fault::connection(msg)))?;

        let options = PgPoolOptions::new()
            .max_connections(config.pool.max_connections_or_default())
            .min_connections(config.pool.min_connections_or_default())
            .idle_timeout(Duration::from_secs(config.pool.idle_timeout_or_default()))
            .acquire_timeout(Duration::from_secs(
                config.pool.acquire_timeout_or_default(),
            ))
            .test_before_acquire(config.pool.test_before_acquire_or_default());

        let pool = options
            .connect(&config.connection_string)
            .await
            .map_err(RunnerError::from)?;

        info!(datasource = %config.name, "Connected to postgres datasource");

        Ok(Self {
            name: config.name,
            pool: Arc::new(PgConnectionPool::new(pool)),
            logger: Arc::new(TracingLogger::new()),
        })
    }

    /// Assemble a datasource from parts, e.g. with a custom logger.
    pub fn from_parts(
        name: impl Into<String>,
        pool: Arc<dyn ConnectionPool>,
        logger: Arc<dyn DatasourceLogger>,
    ) -> Self {
        Self {
            name: name.into(),
            pool,
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create an independent runner over this datasource's pool. Runners are
    /// cheap; create one per unit of work that may hold a transaction.
    pub fn create_query_runner(&self) -> QueryRunner {
        QueryRunner::new(Arc::clone(&self.pool), Arc::clone(&self.logger))
    }

    /// Create an advisory lock for the given key, backed by its own runner.
    pub fn advisory_lock(&self, lock_id: i64) -> AdvisoryLock {
        AdvisoryLock::new(self.create_query_runner(), Arc::clone(&self.logger), lock_id)
    }

    /// Close the underlying pool. Outstanding runners will fail to acquire.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(datasource = %self.name, "Closed postgres datasource");
    }
}

/// A shared, concurrency-safe collection of named datasources.
#[derive(Default)]
pub struct DatasourceRegistry {
    datasources: Arc<RwLock<HashMap<String, Arc<Datasource>>>>,
}

impl DatasourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a datasource under its name. Names are unique; registering
    /// a duplicate is a fault and leaves the existing entry untouched.
    pub async fn register(&self, datasource: Datasource) -> RunnerResult<Arc<Datasource>> {
        let mut datasources = self.datasources.write().await;
        if datasources.contains_key(datasource.name()) {
            return Err(Fault::internal(format!(
                "Datasource '{}' is already registered",
                datasource.name()
            ))
            .into());
        }
        let datasource = Arc::new(datasource);
        datasources.insert(datasource.name().to_string(), Arc::clone(&datasource));
        Ok(datasource)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Datasource>> {
        self.datasources.read().await.get(name).cloned()
    }

    /// Remove a datasource and close its pool. Returns whether it existed.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = self.datasources.write().await.remove(name);
        match removed {
            Some(datasource) => {
                datasource.close().await;
                true
            }
            None => false,
        }
    }

    /// Close every registered datasource and empty the registry.
    pub async fn close_all(&self) {
        let drained: Vec<Arc<Datasource>> =
            self.datasources.write().await.drain().map(|(_, ds)| ds).collect();
        for datasource in drained {
            datasource.close().await;
        }
    }

    pub async fn names(&self) -> Vec<String> {
        self.datasources.read().await.keys().cloned().collect()
    }
}

//! Query execution over the connection pool.
//!
//! One acquire/execute/release round trip per statement, no statement caching
//! and no automatic retry. A terminal driver failure (or a query timeout,
//! which leaves the statement in flight on the wire) evicts the connection
//! from the pool instead of returning it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::domain::DomainError;

use super::driver::{DriverError, QueryResult, SqlValue};
use super::pool::{ConnectionPool, PoolError, PoolStatus};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<QueryError> for DomainError {
    fn from(error: QueryError) -> Self {
        DomainError::infra(error.to_string())
    }
}

impl From<DriverError> for DomainError {
    fn from(error: DriverError) -> Self {
        DomainError::infra(error.to_string())
    }
}

pub struct QueryExecutor {
    pool: Arc<ConnectionPool>,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(pool: Arc<ConnectionPool>, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Run one parameterized statement and collect the full result set.
    pub async fn execute(
        &self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, QueryError> {
        let mut conn = self.pool.acquire().await?;

        match tokio::time::timeout(self.query_timeout, conn.query(statement, params)).await {
            Ok(Ok(result)) => {
                self.pool.release(conn, false).await;
                Ok(result)
            }
            Ok(Err(error)) => {
                let evict = error.is_terminal();
                if evict {
                    warn!(error = %error, "terminal driver error, evicting connection");
                }
                self.pool.release(conn, evict).await;
                Err(error.into())
            }
            Err(_) => {
                // The statement is still in flight on this connection, so it
                // cannot be reused.
                warn!(timeout = ?self.query_timeout, "query timed out, evicting connection");
                self.pool.release(conn, true).await;
                Err(QueryError::Timeout(self.query_timeout))
            }
        }
    }

    /// Cheap round trip used by the health endpoint.
    pub async fn ping(&self) -> Result<(), QueryError> {
        self.execute("SELECT 1", &[]).await.map(|_| ())
    }

    pub async fn pool_status(&self) -> PoolStatus {
        self.pool.status().await
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

//! Database driver collaborator.
//!
//! The pool and executor only ever see the [`Driver`] / [`DriverConnection`]
//! traits. The production implementation, [`PgDriver`], manages single
//! `sqlx::PgConnection` handles; connection construction owns its own
//! timeout-and-retry policy, so the pool never retries a failed handshake.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Connection, PgConnection, Row, TypeInfo};
use thiserror::Error;
use tracing::{debug, warn};

/// Typed statement parameter / result column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Null,
}

impl SqlValue {
    pub fn as_text(&self) -> Result<&str, DriverError> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(DriverError::Decode(format!("expected text, got {other:?}"))),
        }
    }

    pub fn as_int(&self) -> Result<i64, DriverError> {
        match self {
            Self::Int(n) => Ok(*n),
            other => Err(DriverError::Decode(format!(
                "expected integer, got {other:?}"
            ))),
        }
    }

    pub fn as_float(&self) -> Result<f64, DriverError> {
        match self {
            Self::Float(f) => Ok(*f),
            Self::Int(n) => Ok(*n as f64),
            other => Err(DriverError::Decode(format!("expected float, got {other:?}"))),
        }
    }

    pub fn as_timestamp(&self) -> Result<DateTime<Utc>, DriverError> {
        match self {
            Self::Timestamp(t) => Ok(*t),
            other => Err(DriverError::Decode(format!(
                "expected timestamp, got {other:?}"
            ))),
        }
    }

    pub fn as_date(&self) -> Result<NaiveDate, DriverError> {
        match self {
            Self::Date(d) => Ok(*d),
            other => Err(DriverError::Decode(format!("expected date, got {other:?}"))),
        }
    }

    pub fn as_opt_text(&self) -> Result<Option<&str>, DriverError> {
        match self {
            Self::Null => Ok(None),
            other => other.as_text().map(Some),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One result row: ordered column values.
pub type SqlRow = Vec<SqlValue>;

/// Collected result of one statement. Produced once per request, never
/// partial: a row-level error rejects the whole call.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<SqlRow>,
}

impl QueryResult {
    pub fn first(&self) -> Option<&SqlRow> {
        self.rows.first()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Driver-level failures. `Terminal` and `Connect` mean the underlying
/// connection can no longer serve requests and must be discarded.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("connection lost: {0}")]
    Terminal(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

impl DriverError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_) | Self::Connect(_))
    }
}

#[async_trait]
pub trait DriverConnection: Send {
    /// Run one (possibly multi-part) statement with positionally bound
    /// parameters and collect the full result set.
    async fn query(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, DriverError>;

    /// Gracefully terminate the underlying connection.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    async fn connect(&self) -> Result<Box<dyn DriverConnection>, DriverError>;
}

/// Handshake policy for [`PgDriver`].
#[derive(Debug, Clone)]
pub struct ConnectPolicy {
    pub connect_timeout: Duration,
    /// Additional attempts after the first.
    pub retries: u32,
    /// Base backoff; attempt `n` sleeps `base * n`.
    pub backoff: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            retries: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Production driver over single PostgreSQL connections.
#[derive(Debug)]
pub struct PgDriver {
    url: String,
    policy: ConnectPolicy,
}

impl PgDriver {
    pub fn new(url: impl Into<String>, policy: ConnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }
}

#[async_trait]
impl Driver for PgDriver {
    async fn connect(&self) -> Result<Box<dyn DriverConnection>, DriverError> {
        let mut last_error = String::new();

        for attempt in 0..=self.policy.retries {
            if attempt > 0 {
                let backoff = self.policy.backoff * attempt;
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "retrying connect");
                tokio::time::sleep(backoff).await;
            }

            match tokio::time::timeout(
                self.policy.connect_timeout,
                PgConnection::connect(&self.url),
            )
            .await
            {
                Ok(Ok(conn)) => return Ok(Box::new(PgDriverConnection { conn })),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!(
                        "handshake timed out after {:?}",
                        self.policy.connect_timeout
                    )
                }
            }
            warn!(attempt, error = %last_error, "database connect attempt failed");
        }

        Err(DriverError::Connect(last_error))
    }
}

struct PgDriverConnection {
    conn: PgConnection,
}

#[async_trait]
impl DriverConnection for PgDriverConnection {
    async fn query(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, DriverError> {
        let mut query = sqlx::query(statement);
        for param in params {
            query = match param {
                SqlValue::Text(s) => query.bind(s.clone()),
                SqlValue::Int(n) => query.bind(*n),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Bool(b) => query.bind(*b),
                SqlValue::Timestamp(t) => query.bind(*t),
                SqlValue::Date(d) => query.bind(*d),
                SqlValue::Null => query.bind(Option::<String>::None),
            };
        }

        let pg_rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(classify_sqlx_error)?;

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            rows.push(decode_row(pg_row)?);
        }

        Ok(QueryResult { rows })
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        (*self)
            .conn
            .close()
            .await
            .map_err(|e| DriverError::Terminal(e.to_string()))
    }
}

fn classify_sqlx_error(error: sqlx::Error) -> DriverError {
    match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DriverError::Terminal(error.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            DriverError::Decode(error.to_string())
        }
        _ => DriverError::Query(error.to_string()),
    }
}

fn decode_row(row: &PgRow) -> Result<SqlRow, DriverError> {
    let mut values = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = match type_name {
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Text)),
            "INT8" => row
                .try_get::<Option<i64>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Int)),
            "INT4" => row
                .try_get::<Option<i32>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, |n| SqlValue::Int(n.into()))),
            "INT2" => row
                .try_get::<Option<i16>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, |n| SqlValue::Int(n.into()))),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Float)),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, |f| SqlValue::Float(f.into()))),
            "BOOL" => row
                .try_get::<Option<bool>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Bool)),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Timestamp)),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(index)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Date)),
            other => {
                return Err(DriverError::Decode(format!(
                    "unsupported column type '{other}' for column '{}'",
                    column.name()
                )))
            }
        };

        values.push(value.map_err(classify_sqlx_error)?);
    }

    Ok(values)
}

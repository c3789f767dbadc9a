//! Database core: driver collaborator, bounded connection pool, and query
//! executor.

pub mod driver;
pub mod executor;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{
    ConnectPolicy, Driver, DriverConnection, DriverError, PgDriver, QueryResult, SqlRow, SqlValue,
};
pub use executor::{QueryError, QueryExecutor};
pub use pool::{ConnState, ConnectionPool, PoolConfig, PoolError, PoolStatus, PooledConn};

//! Bounded database connection pool.
//!
//! The pool owns a slot list capped at `max_size`. Each slot carries an
//! explicit [`ConnState`]; `Closed` slots are pruned on every acquire.
//! Saturated callers park on a [`Notify`] wait-queue signaled by `release`
//! instead of polling, and give up after a configurable acquire timeout.
//!
//! The pool never retries connection construction; the driver collaborator
//! owns that policy, and a failed handshake propagates to the acquiring
//! caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::driver::{Driver, DriverConnection, DriverError, QueryResult, SqlValue};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Lifecycle state of one pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Ready,
    Busy,
    Closed,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("timed out waiting for a database connection")]
    AcquireTimeout,

    #[error("connection pool is shut down")]
    Closed,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Slot-state counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PoolStatus {
    pub total: usize,
    pub ready: usize,
    pub busy: usize,
    pub connecting: usize,
    pub max_size: usize,
}

struct Slot {
    id: u64,
    state: ConnState,
    /// Present only while the slot is `Ready`; taken while checked out.
    conn: Option<Box<dyn DriverConnection>>,
}

struct PoolInner {
    slots: Vec<Slot>,
    shutting_down: bool,
}

/// A connection checked out of the pool. Must be given back through
/// [`ConnectionPool::release`]; the pool never hands the same slot to a
/// second caller in between.
pub struct PooledConn {
    id: u64,
    conn: Box<dyn DriverConnection>,
}

impl PooledConn {
    pub async fn query(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, DriverError> {
        self.conn.query(statement, params).await
    }
}

pub struct ConnectionPool {
    driver: Arc<dyn Driver>,
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    released: Notify,
    next_id: AtomicU64,
}

impl ConnectionPool {
    pub fn new(driver: Arc<dyn Driver>, config: PoolConfig) -> Self {
        Self {
            driver,
            config,
            inner: Mutex::new(PoolInner {
                slots: Vec::new(),
                shutting_down: false,
            }),
            released: Notify::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Check a connection out of the pool.
    ///
    /// Order of preference: an existing `Ready` slot (first match), then a
    /// freshly constructed connection while under the cap, then waiting for a
    /// release up to the acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConn, PoolError> {
        let deadline = Instant::now() + self.config.acquire_timeout;

        loop {
            // Register with the wait-queue before inspecting the slots, so a
            // release landing between the check and the park is not lost.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let reserved = {
                let mut inner = self.inner.lock().await;
                if inner.shutting_down {
                    return Err(PoolError::Closed);
                }

                inner.slots.retain(|slot| slot.state != ConnState::Closed);

                if let Some(slot) = inner
                    .slots
                    .iter_mut()
                    .find(|slot| slot.state == ConnState::Ready)
                {
                    slot.state = ConnState::Busy;
                    let conn = slot.conn.take().expect("ready slot holds a connection");
                    return Ok(PooledConn { id: slot.id, conn });
                }

                if inner.slots.len() < self.config.max_size {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    inner.slots.push(Slot {
                        id,
                        state: ConnState::Connecting,
                        conn: None,
                    });
                    Some(id)
                } else {
                    None
                }
            };

            if let Some(id) = reserved {
                return self.connect_reserved(id).await;
            }

            // Saturated: park until a release frees a slot or the
            // reservation cap shrinks, bounded by the acquire deadline.
            if timeout_at(deadline, released).await.is_err() {
                return Err(PoolError::AcquireTimeout);
            }
        }
    }

    async fn connect_reserved(&self, id: u64) -> Result<PooledConn, PoolError> {
        match self.driver.connect().await {
            Ok(conn) => {
                let mut inner = self.inner.lock().await;
                if inner.shutting_down {
                    inner.slots.retain(|slot| slot.id != id);
                    drop(inner);
                    if let Err(e) = conn.close().await {
                        debug!(error = %e, "failed to close connection built during shutdown");
                    }
                    return Err(PoolError::Closed);
                }
                if let Some(slot) = inner.slots.iter_mut().find(|slot| slot.id == id) {
                    slot.state = ConnState::Busy;
                }
                debug!(conn_id = id, "established new pooled connection");
                Ok(PooledConn { id, conn })
            }
            Err(e) => {
                {
                    let mut inner = self.inner.lock().await;
                    inner.slots.retain(|slot| slot.id != id);
                }
                // The reservation is gone, so a parked waiter may now build
                // its own connection.
                self.released.notify_waiters();
                Err(e.into())
            }
        }
    }

    /// Return a connection. `failed = true` marks the underlying connection
    /// terminally broken: the slot is evicted and the connection closed
    /// best-effort instead of being reused.
    pub async fn release(&self, conn: PooledConn, failed: bool) {
        let PooledConn { id, conn } = conn;

        if failed {
            {
                let mut inner = self.inner.lock().await;
                inner.slots.retain(|slot| slot.id != id);
            }
            warn!(conn_id = id, "evicting failed connection from pool");
            if let Err(e) = conn.close().await {
                debug!(conn_id = id, error = %e, "closing evicted connection failed");
            }
            self.released.notify_waiters();
            return;
        }

        let orphaned = {
            let mut inner = self.inner.lock().await;
            match inner.slots.iter_mut().find(|slot| slot.id == id) {
                Some(slot) => {
                    slot.state = ConnState::Ready;
                    slot.conn = Some(conn);
                    None
                }
                // Slot disappeared under us: the pool shut down while this
                // connection was checked out.
                None => Some(conn),
            }
        };

        if let Some(conn) = orphaned {
            if let Err(e) = conn.close().await {
                debug!(conn_id = id, error = %e, "closing orphaned connection failed");
            }
        }

        // Broadcast: every parked waiter re-checks the slot list, so two
        // back-to-back releases can never strand a second waiter.
        self.released.notify_waiters();
    }

    /// Close every pooled connection, best-effort. Close failures are logged,
    /// never propagated. Subsequent `acquire` calls fail with
    /// [`PoolError::Closed`]; connections still checked out are closed when
    /// released.
    pub async fn shutdown(&self) {
        let slots = {
            let mut inner = self.inner.lock().await;
            inner.shutting_down = true;
            std::mem::take(&mut inner.slots)
        };

        for slot in slots {
            if let Some(conn) = slot.conn {
                if let Err(e) = conn.close().await {
                    warn!(conn_id = slot.id, error = %e, "failed to close pooled connection");
                }
            }
        }

        // Wake parked waiters so they observe the shutdown.
        self.released.notify_waiters();
    }

    pub async fn status(&self) -> PoolStatus {
        let inner = self.inner.lock().await;
        let mut status = PoolStatus {
            total: inner.slots.len(),
            max_size: self.config.max_size,
            ..PoolStatus::default()
        };
        for slot in &inner.slots {
            match slot.state {
                ConnState::Connecting => status.connecting += 1,
                ConnState::Ready => status.ready += 1,
                ConnState::Busy => status.busy += 1,
                ConnState::Closed => {}
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::super::testing::MockDriver;
    use super::*;

    fn pool_with(driver: Arc<MockDriver>, max_size: usize, acquire_ms: u64) -> ConnectionPool {
        ConnectionPool::new(
            driver,
            PoolConfig {
                max_size,
                acquire_timeout: Duration::from_millis(acquire_ms),
            },
        )
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_max_size() {
        let driver = Arc::new(MockDriver::default());
        let pool = pool_with(driver.clone(), 2, 50);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        let third = pool.acquire().await;
        assert!(matches!(third, Err(PoolError::AcquireTimeout)));

        assert_eq!(driver.connects.load(Ordering::SeqCst), 2);
        let status = pool.status().await;
        assert_eq!(status.total, 2);
        assert_eq!(status.busy, 2);

        pool.release(a, false).await;
        pool.release(b, false).await;
    }

    #[tokio::test]
    async fn test_released_connection_is_reused() {
        let driver = Arc::new(MockDriver::default());
        let pool = pool_with(driver.clone(), 1, 50);

        let conn = pool.acquire().await.unwrap();
        pool.release(conn, false).await;

        let again = pool.acquire().await.unwrap();
        assert_eq!(driver.connects.load(Ordering::SeqCst), 1);
        pool.release(again, false).await;
    }

    #[tokio::test]
    async fn test_no_double_issue_while_checked_out() {
        let driver = Arc::new(MockDriver::default());
        let pool = pool_with(driver.clone(), 1, 50);

        let conn = pool.acquire().await.unwrap();
        assert!(matches!(
            pool.acquire().await,
            Err(PoolError::AcquireTimeout)
        ));

        pool.release(conn, false).await;
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_release_evicts_connection() {
        let driver = Arc::new(MockDriver::default());
        let pool = pool_with(driver.clone(), 2, 50);

        let conn = pool.acquire().await.unwrap();
        pool.release(conn, true).await;

        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
        assert_eq!(pool.status().await.total, 0);

        // The evicted connection is never handed out again; a fresh one is
        // constructed instead.
        let fresh = pool.acquire().await.unwrap();
        assert_eq!(driver.connects.load(Ordering::SeqCst), 2);
        pool.release(fresh, false).await;
    }

    #[tokio::test]
    async fn test_connect_failure_propagates_and_frees_capacity() {
        let driver = Arc::new(MockDriver::default());
        driver.fail_connects.store(1, Ordering::SeqCst);
        let pool = pool_with(driver.clone(), 1, 50);

        assert!(matches!(pool.acquire().await, Err(PoolError::Driver(_))));
        assert_eq!(pool.status().await.total, 0);

        // Capacity was not leaked by the failed reservation.
        let conn = pool.acquire().await.unwrap();
        pool.release(conn, false).await;
    }

    #[tokio::test]
    async fn test_waiter_is_woken_by_release() {
        let driver = Arc::new(MockDriver::default());
        let pool = Arc::new(pool_with(driver.clone(), 1, 1_000));

        let conn = pool.acquire().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.release(conn, false).await;

        let reacquired = waiter.await.unwrap().unwrap();
        assert_eq!(driver.connects.load(Ordering::SeqCst), 1);
        pool.release(reacquired, false).await;
    }

    #[tokio::test]
    async fn test_back_to_back_releases_wake_every_waiter() {
        let driver = Arc::new(MockDriver::default());
        let pool = Arc::new(pool_with(driver.clone(), 2, 1_000));

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.acquire().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.release(a, false).await;
        pool.release(b, false).await;

        // Both waiters get a slot well inside the acquire timeout, without
        // any additional release to nudge them.
        for waiter in waiters {
            let conn = waiter.await.unwrap().unwrap();
            pool.release(conn, false).await;
        }
        assert_eq!(driver.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_and_rejects_acquire() {
        let driver = Arc::new(MockDriver::default());
        let pool = pool_with(driver.clone(), 2, 50);

        let conn = pool.acquire().await.unwrap();
        pool.release(conn, false).await;

        pool.shutdown().await;
        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
        assert!(matches!(pool.acquire().await, Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn test_release_after_shutdown_closes_connection() {
        let driver = Arc::new(MockDriver::default());
        let pool = pool_with(driver.clone(), 1, 50);

        let conn = pool.acquire().await.unwrap();
        pool.shutdown().await;

        pool.release(conn, false).await;
        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
        assert_eq!(pool.status().await.total, 0);
    }
}

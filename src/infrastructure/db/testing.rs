//! Scriptable in-memory driver for pool and executor tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::driver::{Driver, DriverConnection, DriverError, QueryResult, SqlValue};

/// Next behavior for a mock connection's `query` call. When the script is
/// exhausted, queries succeed with an empty result.
pub(crate) enum MockResponse {
    Rows(QueryResult),
    Fail(DriverError),
    /// Never completes; used to exercise the caller-facing query timeout.
    Hang,
}

#[derive(Default)]
pub(crate) struct MockDriver {
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    /// Number of upcoming `connect` calls that should fail.
    pub fail_connects: AtomicUsize,
    pub responses: Arc<Mutex<VecDeque<MockResponse>>>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver")
            .field("connects", &self.connects)
            .finish_non_exhaustive()
    }
}

impl MockDriver {
    pub fn push_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn connect(&self) -> Result<Box<dyn DriverConnection>, DriverError> {
        let failures = self.fail_connects.load(Ordering::SeqCst);
        if failures > 0 {
            self.fail_connects.store(failures - 1, Ordering::SeqCst);
            return Err(DriverError::Connect("connection refused".to_string()));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            responses: self.responses.clone(),
            closes: self.closes.clone(),
        }))
    }
}

struct MockConnection {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl DriverConnection for MockConnection {
    async fn query(
        &mut self,
        _statement: &str,
        _params: &[SqlValue],
    ) -> Result<QueryResult, DriverError> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            None => Ok(QueryResult::default()),
            Some(MockResponse::Rows(result)) => Ok(result),
            Some(MockResponse::Fail(error)) => Err(error),
            Some(MockResponse::Hang) => futures::future::pending().await,
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! In-memory warehouse that records statements instead of running them.
//!
//! Every rendered statement is kept in order. Queries are answered from a
//! queue of canned row sets (empty when the queue is drained). Cursor
//! acquisition can be made to fail a number of times to exercise the
//! reconnect path. Used by `--dry-run` and by tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{Connection, ConnectionProvider, Cursor, QueryHandle, Row, WarehouseError};
use crate::sql::StatementKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStatement {
    pub sql: String,
    pub kind: StatementKind,
    pub timeout: Duration,
}

#[derive(Default)]
struct RecordingState {
    statements: Vec<RecordedStatement>,
    responses: VecDeque<Vec<Row>>,
    pending: HashMap<QueryHandle, Vec<Row>>,
    cursor_failures: usize,
    connects: usize,
    open_cursors: usize,
}

#[derive(Clone, Default)]
pub struct RecordingProvider {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next query.
    pub fn push_response(&self, rows: Vec<Row>) {
        self.lock().responses.push_back(rows);
    }

    /// Make the next `count` cursor acquisitions fail.
    pub fn fail_next_cursors(&self, count: usize) {
        self.lock().cursor_failures = count;
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.lock().statements.clone()
    }

    /// SQL of every recorded statement, in execution order.
    pub fn sql(&self) -> Vec<String> {
        self.lock().statements.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    /// Cursors handed out and not yet closed.
    pub fn open_cursors(&self) -> usize {
        self.lock().open_cursors
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        // A panicking test thread must not hide the recorded statements
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ConnectionProvider for RecordingProvider {
    async fn connect(&self) -> Result<Arc<dyn Connection>, WarehouseError> {
        let generation = {
            let mut state = self.lock();
            state.connects += 1;
            state.connects
        };
        log::debug!("Recording connection #{} opened", generation);
        Ok(Arc::new(RecordingConnection {
            provider: self.clone(),
        }))
    }
}

struct RecordingConnection {
    provider: RecordingProvider,
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn cursor(&self) -> Result<Box<dyn Cursor>, WarehouseError> {
        let mut state = self.provider.lock();
        if state.cursor_failures > 0 {
            state.cursor_failures -= 1;
            return Err(WarehouseError::Disconnected(
                "recording connection refused cursor".to_string(),
            ));
        }
        state.open_cursors += 1;
        Ok(Box::new(RecordingCursor {
            provider: self.provider.clone(),
            closed: false,
        }))
    }
}

struct RecordingCursor {
    provider: RecordingProvider,
    closed: bool,
}

impl RecordingCursor {
    fn record(&self, sql: &str, kind: StatementKind, timeout: Duration) -> Vec<Row> {
        let mut state = self.provider.lock();
        state.statements.push(RecordedStatement {
            sql: sql.to_string(),
            kind,
            timeout,
        });
        match kind {
            StatementKind::Query => state.responses.pop_front().unwrap_or_default(),
            StatementKind::Command => Vec::new(),
        }
    }
}

#[async_trait]
impl Cursor for RecordingCursor {
    async fn execute(
        &mut self,
        sql: &str,
        kind: StatementKind,
        timeout: Duration,
    ) -> Result<Vec<Row>, WarehouseError> {
        Ok(self.record(sql, kind, timeout))
    }

    async fn execute_async(
        &mut self,
        sql: &str,
        timeout: Duration,
    ) -> Result<QueryHandle, WarehouseError> {
        let rows = self.record(sql, StatementKind::Query, timeout);
        let handle = QueryHandle(uuid::Uuid::new_v4().to_string());
        self.provider.lock().pending.insert(handle.clone(), rows);
        Ok(handle)
    }

    async fn results_from_handle(
        &mut self,
        handle: &QueryHandle,
    ) -> Result<Vec<Row>, WarehouseError> {
        self.provider
            .lock()
            .pending
            .remove(handle)
            .ok_or_else(|| WarehouseError::UnknownHandle(handle.clone()))
    }

    async fn close(&mut self) -> Result<(), WarehouseError> {
        if !self.closed {
            self.closed = true;
            self.provider.lock().open_cursors -= 1;
        }
        Ok(())
    }
}

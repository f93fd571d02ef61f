//! ClickHouse adapter.
//!
//! Rows are fetched as `JSONEachRow` and decoded with `serde_json`, which
//! keeps the select order. Commands go through `execute()`.
//!
//! With `session_keep_alive` a connection owns one named HTTP session and
//! ClickHouse rejects concurrent use of a session, so synchronous statements
//! on it take turns behind a lock. Statements submitted asynchronously run
//! on spawned tokio tasks without the session, keyed by a generated query id.
//! Their handles live in a registry owned by the provider, so a handle stays
//! collectable after the executor reconnects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use clickhouse::Client;
use tokio::io::AsyncBufReadExt;
use tokio::task::JoinHandle;

use super::{Connection, ConnectionProvider, Cursor, QueryHandle, Row, WarehouseError};
use crate::config::OrmConfig;
use crate::sql::StatementKind;

/// Uncollected async queries kept per provider.
pub const MAX_PENDING_QUERIES: usize = 256;

type PendingTask = JoinHandle<Result<Vec<Row>, WarehouseError>>;

/// Async queries awaiting `results_from_handle`.
///
/// At capacity, finished but uncollected tasks are dropped to make room;
/// when every slot is still running the submission is refused.
struct PendingRegistry {
    capacity: usize,
    tasks: Mutex<HashMap<QueryHandle, PendingTask>>,
}

impl PendingRegistry {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<QueryHandle, PendingTask>>, WarehouseError> {
        self.tasks
            .lock()
            .map_err(|_| WarehouseError::Disconnected("pending query registry poisoned".to_string()))
    }

    /// Spawns the task only once a slot is available.
    fn register(
        &self,
        handle: QueryHandle,
        spawn: impl FnOnce() -> PendingTask,
    ) -> Result<(), WarehouseError> {
        let mut tasks = self.lock()?;
        if tasks.len() >= self.capacity {
            let before = tasks.len();
            tasks.retain(|_, task| !task.is_finished());
            let evicted = before - tasks.len();
            if evicted > 0 {
                log::warn!("Dropped {} finished async result(s) that were never collected", evicted);
            }
        }
        if tasks.len() >= self.capacity {
            return Err(WarehouseError::PendingLimit(self.capacity));
        }
        tasks.insert(handle, spawn());
        Ok(())
    }

    fn take(&self, handle: &QueryHandle) -> Result<Option<PendingTask>, WarehouseError> {
        Ok(self.lock()?.remove(handle))
    }
}

#[derive(Clone)]
struct ConnectionConfig {
    url: String,
    user: String,
    password: String,
    keep_alive: bool,
}

/// Opens ClickHouse connections from an [`OrmConfig`].
pub struct ClickHouseProvider {
    config: ConnectionConfig,
    pending: Arc<PendingRegistry>,
}

impl ClickHouseProvider {
    pub fn new(config: &OrmConfig) -> Self {
        Self::with_pending_limit(config, MAX_PENDING_QUERIES)
    }

    pub fn with_pending_limit(config: &OrmConfig, limit: usize) -> Self {
        Self {
            config: ConnectionConfig {
                url: config.url.clone(),
                user: config.user.clone(),
                password: config.password.clone(),
                keep_alive: config.session_keep_alive,
            },
            pending: Arc::new(PendingRegistry::new(limit)),
        }
    }
}

impl ConnectionConfig {
    fn create_client(&self, session: bool) -> Client {
        let client = Client::default()
            .with_url(&self.url)
            .with_user(&self.user)
            .with_password(&self.password)
            .with_option("output_format_json_quote_64bit_integers", "0");

        // A named HTTP session keeps server-side state between statements
        if session {
            let session_id = uuid::Uuid::new_v4().to_string();
            log::debug!("Opening ClickHouse session {}", session_id);
            client
                .with_option("session_id", session_id)
                .with_option("session_timeout", "3600")
        } else {
            client
        }
    }
}

impl ClickHouseProvider {
    fn open(&self) -> ClickHouseConnection {
        log::info!("Connecting to ClickHouse at {}", self.config.url);
        let detached = self.config.create_client(false);
        let (session, session_lock) = if self.config.keep_alive {
            (
                self.config.create_client(true),
                Some(Arc::new(tokio::sync::Mutex::new(()))),
            )
        } else {
            (detached.clone(), None)
        };
        ClickHouseConnection {
            session,
            detached,
            session_lock,
            pending: Arc::clone(&self.pending),
        }
    }
}

#[async_trait]
impl ConnectionProvider for ClickHouseProvider {
    async fn connect(&self) -> Result<Arc<dyn Connection>, WarehouseError> {
        Ok(Arc::new(self.open()))
    }
}

pub struct ClickHouseConnection {
    session: Client,
    detached: Client,
    session_lock: Option<Arc<tokio::sync::Mutex<()>>>,
    pending: Arc<PendingRegistry>,
}

#[async_trait]
impl Connection for ClickHouseConnection {
    async fn cursor(&self) -> Result<Box<dyn Cursor>, WarehouseError> {
        Ok(Box::new(ClickHouseCursor {
            session: self.session.clone(),
            detached: self.detached.clone(),
            session_lock: self.session_lock.clone(),
            pending: Arc::clone(&self.pending),
            closed: false,
        }))
    }
}

pub struct ClickHouseCursor {
    session: Client,
    detached: Client,
    session_lock: Option<Arc<tokio::sync::Mutex<()>>>,
    pending: Arc<PendingRegistry>,
    closed: bool,
}

impl ClickHouseCursor {
    fn ensure_open(&self) -> Result<(), WarehouseError> {
        if self.closed {
            return Err(WarehouseError::Disconnected("cursor is closed".to_string()));
        }
        Ok(())
    }
}

async fn fetch_rows(client: Client, sql: String) -> Result<Vec<Row>, WarehouseError> {
    let mut lines = client.query(&sql).fetch_bytes("JSONEachRow")?.lines();

    let mut rows = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line)?;
        rows.push(row);
    }
    Ok(rows)
}

async fn run(
    client: Client,
    sql: String,
    kind: StatementKind,
    timeout: Duration,
) -> Result<Vec<Row>, WarehouseError> {
    let client = client.with_option("max_execution_time", timeout.as_secs().max(1).to_string());
    let work = async move {
        match kind {
            StatementKind::Query => fetch_rows(client, sql).await,
            StatementKind::Command => {
                client.query(&sql).execute().await?;
                Ok(Vec::new())
            }
        }
    };

    tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| WarehouseError::Timeout(timeout))?
}

#[async_trait]
impl Cursor for ClickHouseCursor {
    async fn execute(
        &mut self,
        sql: &str,
        kind: StatementKind,
        timeout: Duration,
    ) -> Result<Vec<Row>, WarehouseError> {
        self.ensure_open()?;
        let _turn = match &self.session_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        run(self.session.clone(), sql.to_string(), kind, timeout).await
    }

    async fn execute_async(
        &mut self,
        sql: &str,
        timeout: Duration,
    ) -> Result<QueryHandle, WarehouseError> {
        self.ensure_open()?;
        let handle = QueryHandle(uuid::Uuid::new_v4().to_string());
        let client = self.detached.clone().with_option("query_id", handle.0.clone());
        let sql = sql.to_string();
        self.pending.register(handle.clone(), || {
            tokio::spawn(run(client, sql, StatementKind::Query, timeout))
        })?;
        Ok(handle)
    }

    async fn results_from_handle(
        &mut self,
        handle: &QueryHandle,
    ) -> Result<Vec<Row>, WarehouseError> {
        self.ensure_open()?;
        let task = self
            .pending
            .take(handle)?
            .ok_or_else(|| WarehouseError::UnknownHandle(handle.clone()))?;

        task.await
            .map_err(|e| WarehouseError::Disconnected(format!("query {} aborted: {}", handle, e)))?
    }

    async fn close(&mut self) -> Result<(), WarehouseError> {
        self.closed = true;
        Ok(())
    }
}

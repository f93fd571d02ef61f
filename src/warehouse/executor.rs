use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{Connection, ConnectionProvider, Cursor, QueryHandle, Row, WarehouseError};
use crate::errors::Result;
use crate::sql::Statement;

/// Runs statements over one shared warehouse connection.
///
/// The connection is opened lazily. When a cursor cannot be acquired the
/// connection is replaced exactly once and acquisition retried; a second
/// failure is returned to the caller. Replacement happens under a mutex, so
/// concurrent callers that hit the same dead connection reconnect only once.
pub struct QueryExecutor {
    provider: Arc<dyn ConnectionProvider>,
    connection: Mutex<Option<Arc<dyn Connection>>>,
    default_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(provider: Arc<dyn ConnectionProvider>, default_timeout: Duration) -> Self {
        Self {
            provider,
            connection: Mutex::new(None),
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `statement` and return its rows (empty for commands).
    pub async fn execute(
        &self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Vec<Row>> {
        let sql = statement.render()?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        log::debug!("Executing SQL:\n{}", sql);

        let mut cursor = self.acquire_cursor().await?;
        let result = cursor.execute(&sql, statement.kind(), timeout).await;
        release(cursor).await;

        result.map_err(|e| {
            log::error!("Warehouse query failed. SQL was:\n{}\nError: {}", sql, e);
            e.into()
        })
    }

    /// Submit `statement` without waiting for its rows.
    pub async fn execute_async(
        &self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<QueryHandle> {
        let sql = statement.render()?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        log::debug!("Submitting SQL:\n{}", sql);

        let mut cursor = self.acquire_cursor().await?;
        let result = cursor.execute_async(&sql, timeout).await;
        release(cursor).await;

        let handle = result?;
        log::debug!("Submitted query {}", handle);
        Ok(handle)
    }

    /// Rows of a statement previously submitted with [`execute_async`](Self::execute_async).
    pub async fn fetch_async_result(&self, handle: &QueryHandle) -> Result<Vec<Row>> {
        let mut cursor = self.acquire_cursor().await?;
        let result = cursor.results_from_handle(handle).await;
        release(cursor).await;
        Ok(result?)
    }

    async fn current_connection(&self) -> std::result::Result<Arc<dyn Connection>, WarehouseError> {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.as_ref() {
            return Ok(Arc::clone(connection));
        }

        log::info!("Opening warehouse connection");
        let connection = self.provider.connect().await?;
        *guard = Some(Arc::clone(&connection));
        Ok(connection)
    }

    async fn reconnect(
        &self,
        stale: &Arc<dyn Connection>,
    ) -> std::result::Result<Arc<dyn Connection>, WarehouseError> {
        let mut guard = self.connection.lock().await;

        // Another caller already replaced the stale connection
        if let Some(current) = guard.as_ref() {
            if !Arc::ptr_eq(current, stale) {
                return Ok(Arc::clone(current));
            }
        }

        *guard = None;
        let fresh = self.provider.connect().await?;
        *guard = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    async fn acquire_cursor(&self) -> std::result::Result<Box<dyn Cursor>, WarehouseError> {
        let connection = self.current_connection().await?;
        match connection.cursor().await {
            Ok(cursor) => Ok(cursor),
            Err(e) => {
                log::warn!("Cursor acquisition failed ({}), resetting connection", e);
                let fresh = self.reconnect(&connection).await?;
                fresh.cursor().await
            }
        }
    }
}

async fn release(mut cursor: Box<dyn Cursor>) {
    if let Err(e) = cursor.close().await {
        log::warn!("Failed to close cursor: {}", e);
    }
}

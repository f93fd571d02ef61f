//! Query execution against the warehouse.
//!
//! The warehouse client is reached through three traits mirroring a
//! connection/cursor driver: a [`ConnectionProvider`] opens [`Connection`]s,
//! a connection hands out [`Cursor`]s, and a cursor runs one statement.
//! [`QueryExecutor`] owns the shared connection and adds the single
//! reconnect-on-cursor-failure retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql::StatementKind;

pub mod clickhouse_client;
pub mod executor;
pub mod recording;

pub use clickhouse_client::ClickHouseProvider;
pub use executor::QueryExecutor;
pub use recording::RecordingProvider;

/// One result row, column name to value, in select order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Identifier of a statement submitted with `execute_async`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryHandle(pub String);

impl std::fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Warehouse client error: {0}")]
    Client(#[from] clickhouse::error::Error),
    #[error("Warehouse I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode result row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Statement exceeded timeout of {0:?}")]
    Timeout(Duration),
    #[error("Unknown query handle: {0}")]
    UnknownHandle(QueryHandle),
    #[error("Too many uncollected async queries (limit {0})")]
    PendingLimit(usize),
    #[error("Connection unavailable: {0}")]
    Disconnected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cursor: Send {
    async fn execute(
        &mut self,
        sql: &str,
        kind: StatementKind,
        timeout: Duration,
    ) -> Result<Vec<Row>, WarehouseError>;

    async fn execute_async(
        &mut self,
        sql: &str,
        timeout: Duration,
    ) -> Result<QueryHandle, WarehouseError>;

    async fn results_from_handle(
        &mut self,
        handle: &QueryHandle,
    ) -> Result<Vec<Row>, WarehouseError>;

    async fn close(&mut self) -> Result<(), WarehouseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    async fn cursor(&self) -> Result<Box<dyn Cursor>, WarehouseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Connection>, WarehouseError>;
}

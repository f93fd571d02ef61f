use thiserror::Error;

use crate::config::ConfigError;
use crate::mapping::MappingError;
use crate::sql::SqlError;
use crate::warehouse::WarehouseError;

/// Error returned by every public operation.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("SQL error: {0}")]
    Sql(#[from] SqlError),
    #[error("Execution error: {0}")]
    Warehouse(#[from] WarehouseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T, E = OrmError> = std::result::Result<T, E>;

//! tablemap - a small ORM over a warehouse SQL client
//!
//! Plain structs declare where they live and how their fields map to columns;
//! the crate resolves that declaration, builds parameterized SQL and runs it
//! through a pluggable execution adapter (ClickHouse, or an in-memory recorder
//! for dry runs and tests).
//!
//! - [`mapping`]: entity declarations and mapping resolution
//! - [`sql`]: identifiers, filter clauses and bound statements
//! - [`warehouse`]: connection, cursor and executor
//! - [`crud`]: the [`Repository`] operations
//! - [`serialization`]: JSON, HTML and CSV conversions

pub mod config;
pub mod crud;
pub mod errors;
pub mod keygen;
pub mod mapping;
pub mod serialization;
pub mod sql;
pub mod warehouse;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

pub use config::OrmConfig;
pub use crud::{Lookup, Repository};
pub use errors::{OrmError, Result};
pub use mapping::{Entity, Fields, KeyMarker, MappingEntry, MappingPolicy};
pub use serialization::{CsvImport, CsvRowError};
pub use sql::{DateRange, FilterValue, Filters, Statement};
pub use warehouse::{QueryExecutor, QueryHandle, Row};

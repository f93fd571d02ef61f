//! CRUD operations over mapped entities.
//!
//! [`Repository`] ties the pieces together: every operation resolves the
//! entity's mapping, builds a parameterized statement (see [`statements`])
//! and runs it through the shared [`QueryExecutor`].

use std::sync::Arc;

use crate::config::OrmConfig;
use crate::errors::Result;
use crate::keygen::{generate_key, KeyOptions};
use crate::mapping::{
    assign_logical, is_unset, read_logical, resolve, Entity, MappingError, ResolvedMapping,
};
use crate::serialization::assign_mapped;
use crate::sql::{Filters, Statement};
use crate::warehouse::{ClickHouseProvider, QueryExecutor, QueryHandle, Row};

pub mod statements;

/// Outcome of [`Repository::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// A row matched and was assigned into the entity
    Found,
    /// No row matched; the entity is unchanged
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found)
    }
}

pub struct Repository {
    executor: Arc<QueryExecutor>,
    config: Arc<OrmConfig>,
}

impl Repository {
    pub fn new(executor: Arc<QueryExecutor>, config: OrmConfig) -> Self {
        Self {
            executor,
            config: Arc::new(config),
        }
    }

    /// Repository backed by ClickHouse, connecting on first use.
    pub fn clickhouse(config: OrmConfig) -> Self {
        let provider = Arc::new(ClickHouseProvider::new(&config));
        let executor = Arc::new(QueryExecutor::new(provider, config.query_timeout()));
        Self::new(executor, config)
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn resolve<E: Entity>(&self) -> Result<ResolvedMapping> {
        Ok(resolve::<E>(&self.config)?)
    }

    fn sanitize(&self) -> bool {
        self.config.sanitize_queries
    }

    /// Load one row into `entity`, selected by `filters` or else by the
    /// entity's key columns.
    pub async fn get<E: Entity>(&self, entity: &mut E, filters: Option<&Filters>) -> Result<Lookup> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::select_one(&resolved, entity, filters, self.sanitize())?;
        let rows = self.executor.execute(&statement, None).await?;

        let Some(row) = rows.into_iter().next() else {
            log::debug!("{}: no row matched", resolved.entity);
            return Ok(Lookup::NotFound);
        };

        // Assign into a copy so a rejected value leaves the caller's entity untouched
        let mut loaded = copy_fields(entity)?;
        assign_row(&mut loaded, &resolved, row)?;
        *entity = loaded;
        Ok(Lookup::Found)
    }

    /// Every distinct row matching `filters` (all rows when `None`).
    pub async fn get_all<E: Entity>(&self, filters: Option<&Filters>) -> Result<Vec<E>> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::select_all(&resolved, filters, self.sanitize())?;
        let rows = self.executor.execute(&statement, None).await?;
        materialize_all(&resolved, rows)
    }

    /// Submit the [`get_all`](Self::get_all) query without waiting for rows.
    pub async fn submit_all<E: Entity>(&self, filters: Option<&Filters>) -> Result<QueryHandle> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::select_all(&resolved, filters, self.sanitize())?;
        self.executor.execute_async(&statement, None).await
    }

    /// Entities for a query submitted with [`submit_all`](Self::submit_all).
    pub async fn collect_all<E: Entity>(&self, handle: &QueryHandle) -> Result<Vec<E>> {
        let resolved = self.resolve::<E>()?;
        let rows = self.executor.fetch_async_result(handle).await?;
        materialize_all(&resolved, rows)
    }

    /// Run caller-supplied SQL and deserialize each row through the mapping.
    pub async fn get_all_from_query<E: Entity>(&self, statement: &Statement) -> Result<Vec<E>> {
        let resolved = self.resolve::<E>()?;
        let rows = self.executor.execute(statement, None).await?;
        rows.iter()
            .map(|row| {
                let mut entity = E::default();
                assign_mapped(&mut entity, row, None, &resolved)?;
                Ok(entity)
            })
            .collect()
    }

    /// Insert `entity`, first generating its primary key when it is unset
    /// and auto-generation is enabled.
    pub async fn insert<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let resolved = self.resolve::<E>()?;

        if self.config.auto_generate_primary_key {
            if let Some(field) = resolved.mapping.primary_key_field() {
                let current = read_logical(entity, field, resolved.policy)?;
                if is_unset(current.as_ref()) {
                    let key = generate_key(&KeyOptions::with_length(self.config.primary_key_length));
                    log::debug!("{}: generated primary key {}", resolved.entity, key);
                    assign_logical(entity, field, key.into(), resolved.policy)?;
                }
            }
        }

        let statement = statements::insert(&resolved, entity, self.sanitize())?;
        self.executor.execute(&statement, None).await?;
        Ok(())
    }

    /// The statement [`insert`](Self::insert) would run, without key generation.
    pub fn insert_statement<E: Entity>(&self, entity: &E) -> Result<Statement> {
        let resolved = self.resolve::<E>()?;
        statements::insert(&resolved, entity, self.sanitize())
    }

    /// Overwrite every mapped column of the row matching the entity's keys.
    pub async fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::update(&resolved, entity, self.sanitize())?;
        self.executor.execute(&statement, None).await?;
        Ok(())
    }

    pub async fn delete<E: Entity>(&self, entity: &E, filters: Option<&Filters>) -> Result<()> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::delete(&resolved, entity, filters, self.sanitize())?;
        self.executor.execute(&statement, None).await?;
        Ok(())
    }

    pub async fn truncate<E: Entity>(&self) -> Result<()> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::truncate(&resolved, self.sanitize())?;
        self.executor.execute(&statement, None).await?;
        Ok(())
    }

    pub async fn drop_table<E: Entity>(&self) -> Result<()> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::drop_table(&resolved, self.sanitize())?;
        self.executor.execute(&statement, None).await?;
        Ok(())
    }

    /// Create the entity's table, inferring column types from `E::default()`.
    pub async fn create_table<E: Entity>(&self) -> Result<()> {
        let resolved = self.resolve::<E>()?;
        let statement = statements::create_table(
            &resolved,
            &E::default(),
            self.config.table_engine.as_deref(),
            self.sanitize(),
        )?;
        self.executor.execute(&statement, None).await?;
        Ok(())
    }

    /// Assign a fresh key of `length` characters to the primary-key field.
    /// Returns the key, or `None` when the entity declares no primary key.
    pub fn generate_primary_key<E: Entity>(
        &self,
        entity: &mut E,
        length: usize,
    ) -> Result<Option<String>> {
        let resolved = self.resolve::<E>()?;
        let Some(field) = resolved.mapping.primary_key_field() else {
            return Ok(None);
        };
        let key = generate_key(&KeyOptions::with_length(length));
        assign_logical(entity, field, key.clone().into(), resolved.policy)?;
        Ok(Some(key))
    }
}

/// Assign every column of `row` into `entity`. Select lists alias columns to
/// field names, which are matched case-insensitively.
fn assign_row<E: Entity>(entity: &mut E, resolved: &ResolvedMapping, row: Row) -> Result<()> {
    for (name, value) in row {
        assign_logical(entity, &name, value, resolved.policy)?;
    }
    Ok(())
}

fn copy_fields<E: Entity>(entity: &E) -> Result<E> {
    let mut copy = E::default();
    for field in E::FIELD_NAMES {
        let field_error = |source| MappingError::FieldValue {
            entity: E::entity_name(),
            field: field.to_string(),
            source,
        };
        if let Some(value) = entity.read_field(field).map_err(field_error)? {
            copy.write_field(field, value).map_err(field_error)?;
        }
    }
    Ok(copy)
}

fn materialize_all<E: Entity>(resolved: &ResolvedMapping, rows: Vec<Row>) -> Result<Vec<E>> {
    rows.into_iter()
        .map(|row| {
            let mut entity = E::default();
            assign_row(&mut entity, resolved, row)?;
            Ok(entity)
        })
        .collect()
}

//! Resolves an entity type to its table location and column/field mapping.
//!
//! Resolution rules, in order:
//!
//! 1. An empty resource map becomes the identity mapping over every field.
//! 2. A resource map holding only key declarations gets its column entries
//!    synthesized from the struct's fields, filtered by [`MappingPolicy`].
//!    The key declarations are kept and stay authoritative for key roles.
//! 3. Anything else is used exactly as declared.

use serde::{Deserialize, Serialize};

use super::entity::{is_private, Entity, KeyMarker, MappingEntry, PRIVATE_MARKER};
use super::errors::MappingError;
use crate::config::OrmConfig;

/// How synthesized mappings treat `_`-prefixed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MappingPolicy {
    /// Map every field under its own name
    IncludeAll,
    /// Leave private fields out
    ExcludePrivate,
    /// Leave private fields out, but map them under the unprefixed name
    #[default]
    OverridePrivate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub column: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeclaration {
    pub marker: KeyMarker,
    pub columns: Vec<String>,
}

/// Ordered column entries plus key declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMapping {
    columns: Vec<ColumnMapping>,
    keys: Vec<KeyDeclaration>,
}

impl ResourceMapping {
    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    pub fn keys(&self) -> &[KeyDeclaration] {
        &self.keys
    }

    pub fn key(&self, marker: KeyMarker) -> Option<&KeyDeclaration> {
        self.keys.iter().find(|k| k.marker == marker)
    }

    /// Field stored in `column`, matched case-insensitively. A column with no
    /// entry maps to the field of the same name.
    pub fn field_for_column<'a>(&'a self, column: &'a str) -> &'a str {
        self.columns
            .iter()
            .find(|c| c.column.eq_ignore_ascii_case(column))
            .map(|c| c.field.as_str())
            .unwrap_or(column)
    }

    /// Mapped field addressed by `name`, either as a column or as the field
    /// itself (both case-insensitive). `None` when the mapping excludes it.
    pub fn mapped_field(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.column.eq_ignore_ascii_case(name))
            .or_else(|| self.columns.iter().find(|c| c.field.eq_ignore_ascii_case(name)))
            .map(|c| c.field.as_str())
    }

    /// Field holding the first primary-key column.
    pub fn primary_key_field(&self) -> Option<&str> {
        self.key(KeyMarker::Primary)
            .and_then(|k| k.columns.first())
            .map(|column| self.field_for_column(column))
    }

    fn push_column(&mut self, column: &str, field: &str) {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.column == column) {
            existing.field = field.to_string();
        } else {
            self.columns.push(ColumnMapping {
                column: column.to_string(),
                field: field.to_string(),
            });
        }
    }
}

/// Where an entity lives and how its columns map to fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub entity: &'static str,
    pub server: String,
    pub database: String,
    pub middleware: String,
    pub table: String,
    pub mapping: ResourceMapping,
    pub policy: MappingPolicy,
}

/// Build the resource mapping for `E` from its declaration and field list.
pub fn resource_mapping<E: Entity>(policy: MappingPolicy) -> ResourceMapping {
    let declared = E::resource_map();
    let mut mapping = ResourceMapping::default();

    for entry in declared {
        match entry {
            MappingEntry::Column(column, field) => mapping.push_column(column, field),
            MappingEntry::Key(marker, columns) => mapping.keys.push(KeyDeclaration {
                marker: *marker,
                columns: columns.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }

    if declared.is_empty() {
        for field in E::FIELD_NAMES {
            mapping.push_column(field, field);
        }
    } else if mapping.columns.is_empty() {
        synthesize_columns::<E>(&mut mapping, policy);
    }

    mapping
}

fn synthesize_columns<E: Entity>(mapping: &mut ResourceMapping, policy: MappingPolicy) {
    for field in E::FIELD_NAMES {
        match policy {
            MappingPolicy::IncludeAll => mapping.push_column(field, field),
            MappingPolicy::ExcludePrivate | MappingPolicy::OverridePrivate
                if !is_private(field) =>
            {
                mapping.push_column(field, field)
            }
            MappingPolicy::ExcludePrivate => {}
            MappingPolicy::OverridePrivate => {
                if let Some(public) = field
                    .strip_prefix(PRIVATE_MARKER)
                    .filter(|public| !public.is_empty())
                {
                    mapping.push_column(public, public);
                }
            }
        }
    }
}

fn required(
    entity: &'static str,
    missing: &'static str,
    value: Option<&str>,
) -> Result<String, MappingError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(MappingError::MissingMapping { entity, missing }),
    }
}

/// Resolve `E` against `config`.
pub fn resolve<E: Entity>(config: &OrmConfig) -> Result<ResolvedMapping, MappingError> {
    let entity = E::entity_name();
    let policy = config.mapping_policy();

    let server = required(
        entity,
        "server",
        E::server().or(Some(config.default_server.as_str())),
    )?;
    let database = required(entity, "database", E::database())?;
    let table = required(entity, "table", E::table())?;
    let middleware = E::middleware()
        .unwrap_or(config.default_middleware.as_str())
        .to_string();

    let mapping = resource_mapping::<E>(policy);
    log::debug!(
        "Resolved {} -> {}.{}.{} on {} ({} columns, {} key declarations)",
        entity,
        database,
        middleware,
        table,
        server,
        mapping.columns().len(),
        mapping.keys().len()
    );

    Ok(ResolvedMapping {
        entity,
        server,
        database,
        middleware,
        table,
        mapping,
        policy,
    })
}

//! JSON, HTML and CSV conversions of mapped entities.
//!
//! Every conversion resolves the entity first, so an entity without a
//! complete table declaration fails here exactly as it does for CRUD.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::OrmConfig;
use crate::errors::Result;
use crate::mapping::{assign_logical, read_logical, resolve, Entity, ResolvedMapping};

/// Column name to field name overrides applied before the resource map.
pub type OverrideMap = HashMap<String, String>;

/// `{field: value}` for every column entry of `E`.
pub fn serialize_to_json<E: Entity>(entity: &E, config: &OrmConfig) -> Result<Map<String, Value>> {
    let resolved = resolve::<E>(config)?;
    mapped_values(entity, &resolved)
}

fn mapped_values<E: Entity>(entity: &E, resolved: &ResolvedMapping) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for column in resolved.mapping.columns() {
        let value = read_logical(entity, &column.field, resolved.policy)?.unwrap_or(Value::Null);
        out.insert(column.field.clone(), value);
    }
    Ok(out)
}

/// Replace every `@field@` placeholder in `template` with the field's value.
/// Null renders as the empty string; unknown placeholders are left as is.
pub fn serialize_to_html<E: Entity>(entity: &E, template: &str, config: &OrmConfig) -> Result<String> {
    let values = serialize_to_json(entity, config)?;
    let mut html = template.to_string();
    for (field, value) in values {
        let text = match value {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        };
        html = html.replace(&format!("@{}@", field), &text);
    }
    Ok(html)
}

/// Field targeted by incoming key `key`: the override map first, then a
/// mapped column or field of that name. Keys the mapping excludes target
/// nothing.
fn target_field(
    key: &str,
    resolved: &ResolvedMapping,
    overrides: Option<&OverrideMap>,
) -> Option<String> {
    overrides
        .and_then(|o| {
            o.iter()
                .find(|(column, _)| column.eq_ignore_ascii_case(key))
                .map(|(_, field)| field.clone())
        })
        .or_else(|| resolved.mapping.mapped_field(key).map(str::to_string))
}

/// Assign every mapped key of `data` into `entity`; other keys are ignored
/// and leave their fields untouched. Returns the number of fields assigned.
pub fn deserialize_from_json<E: Entity>(
    entity: &mut E,
    data: &Map<String, Value>,
    overrides: Option<&OverrideMap>,
    config: &OrmConfig,
) -> Result<usize> {
    let resolved = resolve::<E>(config)?;
    assign_mapped(entity, data, overrides, &resolved)
}

pub(crate) fn assign_mapped<E: Entity>(
    entity: &mut E,
    data: &Map<String, Value>,
    overrides: Option<&OverrideMap>,
    resolved: &ResolvedMapping,
) -> Result<usize> {
    let mut assigned = 0;
    for (key, value) in data {
        let Some(field) = target_field(key, resolved, overrides) else {
            continue;
        };
        if assign_logical(entity, &field, value.clone(), resolved.policy)? {
            assigned += 1;
        }
    }
    Ok(assigned)
}

/// A CSV row that could not be turned into an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvRowError {
    /// 1-based line number, the header being line 1
    pub line: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct CsvImport<E> {
    pub entities: Vec<E>,
    pub rejected: Vec<CsvRowError>,
}

impl<E> Default for CsvImport<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Build one entity per data row. The first row is the header naming the
/// column of each cell; it is never materialized itself.
pub fn deserialize_from_csv<E, R, C>(
    rows: R,
    overrides: Option<&OverrideMap>,
    config: &OrmConfig,
) -> Result<CsvImport<E>>
where
    E: Entity,
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<str>,
{
    let resolved = resolve::<E>(config)?;
    let mut rows = rows.into_iter();
    let mut import = CsvImport::default();
    let Some(header) = rows.next() else {
        return Ok(import);
    };
    let header: Vec<String> = header.iter().map(|h| h.as_ref().trim().to_string()).collect();

    for (index, row) in rows.enumerate() {
        let line = index + 2;
        if row.len() != header.len() {
            import.rejected.push(CsvRowError {
                line,
                reason: format!("expected {} cells, found {}", header.len(), row.len()),
            });
            continue;
        }

        let data: Map<String, Value> = header
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| (column.clone(), Value::String(cell.as_ref().to_string())))
            .collect();

        let mut entity = E::default();
        match assign_mapped(&mut entity, &data, overrides, &resolved) {
            Ok(_) => import.entities.push(entity),
            Err(e) => {
                log::warn!("{}: rejected CSV line {}: {}", E::entity_name(), line, e);
                import.rejected.push(CsvRowError {
                    line,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(import)
}

/// `Type {json}` when `override_string_representation` is on, else the type
/// name alone.
pub fn describe<E: Entity>(entity: &E, config: &OrmConfig) -> Result<String> {
    let resolved = resolve::<E>(config)?;
    if !config.override_string_representation {
        return Ok(E::entity_name().to_string());
    }
    let json = mapped_values(entity, &resolved)?;
    Ok(format!("{} {}", E::entity_name(), Value::Object(json)))
}

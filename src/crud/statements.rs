//! Statement construction for the CRUD operations. Nothing here talks to the
//! warehouse; every function turns a resolved mapping (and possibly an
//! entity) into a parameterized [`Statement`].

use serde_json::Value;

use crate::errors::Result;
use crate::mapping::{read_logical, Entity, MappingError, ResolvedMapping};
use crate::sql::{
    checked_identifier, qualified_table, write_clauses, Filters, Statement, StatementBuilder,
    StatementKind,
};

fn table_ref(resolved: &ResolvedMapping, sanitize: bool) -> Result<String> {
    Ok(qualified_table(
        &resolved.database,
        &resolved.middleware,
        &resolved.table,
        sanitize,
    )?)
}

/// `col AS field, ...` over every column entry.
fn select_list(resolved: &ResolvedMapping, sanitize: bool) -> Result<String> {
    let columns = resolved
        .mapping
        .columns()
        .iter()
        .map(|c| -> Result<String> {
            Ok(format!(
                "{} AS {}",
                checked_identifier(&c.column, sanitize)?,
                checked_identifier(&c.field, sanitize)?
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    if columns.is_empty() {
        Ok("*".to_string())
    } else {
        Ok(columns.join(", "))
    }
}

/// Column-to-text conversion used by insert and update: null becomes the
/// empty string, everything else its display form.
fn stringify(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(Value::String(s)) => Value::String(s),
        Some(other) => Value::String(other.to_string()),
    }
}

/// Equality predicates over every declared key column of `entity`.
pub fn write_key_clause<E: Entity>(
    builder: &mut StatementBuilder,
    resolved: &ResolvedMapping,
    entity: &E,
    sanitize: bool,
) -> Result<()> {
    let mut written = 0;
    for key in resolved.mapping.keys() {
        for column in &key.columns {
            if written > 0 {
                builder.push_sql(" AND ");
            }
            let column_sql = checked_identifier(column, sanitize)?;
            let field = resolved.mapping.field_for_column(column);
            match read_logical(entity, field, resolved.policy)? {
                None | Some(Value::Null) => {
                    builder.push_sql(&format!("{} is null", column_sql));
                }
                Some(value) => {
                    builder
                        .push_sql(&format!("{} = ", column_sql))
                        .push_bind(value);
                }
            }
            written += 1;
        }
    }

    if written == 0 {
        return Err(MappingError::MissingKey {
            entity: resolved.entity,
        }
        .into());
    }
    Ok(())
}

/// ` WHERE <filters>` when filters are given, else ` WHERE <key clause>`.
fn write_where<E: Entity>(
    builder: &mut StatementBuilder,
    resolved: &ResolvedMapping,
    entity: &E,
    filters: Option<&Filters>,
    sanitize: bool,
) -> Result<()> {
    builder.push_sql(" WHERE ");
    match filters {
        Some(filters) if !filters.is_empty() => write_clauses(builder, filters, sanitize)?,
        _ => write_key_clause(builder, resolved, entity, sanitize)?,
    }
    Ok(())
}

pub fn select_one<E: Entity>(
    resolved: &ResolvedMapping,
    entity: &E,
    filters: Option<&Filters>,
    sanitize: bool,
) -> Result<Statement> {
    let mut builder = StatementBuilder::new(StatementKind::Query);
    builder.push_sql(&format!(
        "select top 1 {} from {}",
        select_list(resolved, sanitize)?,
        table_ref(resolved, sanitize)?
    ));
    write_where(&mut builder, resolved, entity, filters, sanitize)?;
    Ok(builder.finish())
}

pub fn select_all(
    resolved: &ResolvedMapping,
    filters: Option<&Filters>,
    sanitize: bool,
) -> Result<Statement> {
    let mut builder = StatementBuilder::new(StatementKind::Query);
    builder.push_sql(&format!(
        "select distinct {} from {}",
        select_list(resolved, sanitize)?,
        table_ref(resolved, sanitize)?
    ));
    if let Some(filters) = filters.filter(|f| !f.is_empty()) {
        builder.push_sql(" WHERE ");
        write_clauses(&mut builder, filters, sanitize)?;
    }
    Ok(builder.finish())
}

pub fn insert<E: Entity>(resolved: &ResolvedMapping, entity: &E, sanitize: bool) -> Result<Statement> {
    let mut builder = StatementBuilder::new(StatementKind::Command);
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();

    for mapping in resolved.mapping.columns() {
        columns.push(checked_identifier(&mapping.column, sanitize)?.to_string());
        let value = read_logical(entity, &mapping.field, resolved.policy)?;
        placeholders.push(builder.bind(stringify(value)));
    }

    builder.push_sql(&format!(
        "insert into {} ({}) values ({})",
        table_ref(resolved, sanitize)?,
        columns.join(", "),
        placeholders.join(", ")
    ));
    Ok(builder.finish())
}

pub fn update<E: Entity>(resolved: &ResolvedMapping, entity: &E, sanitize: bool) -> Result<Statement> {
    let mut builder = StatementBuilder::new(StatementKind::Command);
    let mut assignments = Vec::new();

    for mapping in resolved.mapping.columns() {
        let column = checked_identifier(&mapping.column, sanitize)?;
        let value = read_logical(entity, &mapping.field, resolved.policy)?;
        assignments.push(format!("{} = {}", column, builder.bind(stringify(value))));
    }

    builder.push_sql(&format!(
        "update {} set {}",
        table_ref(resolved, sanitize)?,
        assignments.join(", ")
    ));
    write_where(&mut builder, resolved, entity, None, sanitize)?;
    Ok(builder.finish())
}

pub fn delete<E: Entity>(
    resolved: &ResolvedMapping,
    entity: &E,
    filters: Option<&Filters>,
    sanitize: bool,
) -> Result<Statement> {
    let mut builder = StatementBuilder::new(StatementKind::Command);
    builder.push_sql(&format!("delete from {}", table_ref(resolved, sanitize)?));
    write_where(&mut builder, resolved, entity, filters, sanitize)?;
    Ok(builder.finish())
}

pub fn truncate(resolved: &ResolvedMapping, sanitize: bool) -> Result<Statement> {
    Ok(Statement::command(format!(
        "truncate table {}",
        table_ref(resolved, sanitize)?
    )))
}

pub fn drop_table(resolved: &ResolvedMapping, sanitize: bool) -> Result<Statement> {
    Ok(Statement::command(format!(
        "drop table if exists {}",
        table_ref(resolved, sanitize)?
    )))
}

/// Column type token inferred from a runtime value.
pub fn column_type(value: Option<&Value>) -> &'static str {
    match value {
        Some(Value::Bool(_)) => "BOOLEAN",
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => "BIGINT",
        Some(Value::Number(_)) => "DOUBLE",
        _ => "VARCHAR",
    }
}

/// `create table if not exists` with types inferred from `sample`.
pub fn create_table<E: Entity>(
    resolved: &ResolvedMapping,
    sample: &E,
    engine: Option<&str>,
    sanitize: bool,
) -> Result<Statement> {
    let columns = resolved
        .mapping
        .columns()
        .iter()
        .map(|mapping| -> Result<String> {
            let value = read_logical(sample, &mapping.field, resolved.policy)?;
            Ok(format!(
                "{} {}",
                checked_identifier(&mapping.column, sanitize)?,
                column_type(value.as_ref())
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut sql = format!(
        "create table if not exists {} ({})",
        table_ref(resolved, sanitize)?,
        columns.join(", ")
    );
    if let Some(engine) = engine {
        sql.push_str(&format!(" ENGINE = {}", engine));
    }
    Ok(Statement::command(sql))
}

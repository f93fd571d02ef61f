use std::collections::HashMap;

use serde_json::Value;

use super::errors::SqlError;
use super::parameter_substitution::substitute_parameters;

/// Whether a statement produces rows or only side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Command,
}

/// SQL text with `$name` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: HashMap<String, Value>,
    kind: StatementKind,
}

impl Statement {
    /// A statement without bound parameters.
    pub fn raw(sql: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            params: HashMap::new(),
            kind,
        }
    }

    pub fn query(sql: impl Into<String>) -> Self {
        Self::raw(sql, StatementKind::Query)
    }

    pub fn command(sql: impl Into<String>) -> Self {
        Self::raw(sql, StatementKind::Command)
    }

    /// Bind a named parameter referenced as `$name` in the SQL text.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// SQL with every placeholder replaced by an escaped literal. Statements
    /// without bound values are returned verbatim.
    pub fn render(&self) -> Result<String, SqlError> {
        if self.params.is_empty() {
            return Ok(self.sql.clone());
        }
        Ok(substitute_parameters(&self.sql, &self.params)?)
    }
}

/// Incrementally assembles a [`Statement`], handing out placeholder names.
#[derive(Debug)]
pub struct StatementBuilder {
    sql: String,
    params: HashMap<String, Value>,
    kind: StatementKind,
}

impl StatementBuilder {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            sql: String::new(),
            params: HashMap::new(),
            kind,
        }
    }

    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Binds `value` and returns its placeholder (`$p0`, `$p1`, ...).
    pub fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.params.len());
        self.params.insert(name.clone(), value);
        format!("${}", name)
    }

    /// Binds `value` and appends its placeholder.
    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        let placeholder = self.bind(value);
        self.sql.push_str(&placeholder);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            kind: self.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_binds_sequential_placeholders() {
        let mut builder = StatementBuilder::new(StatementKind::Query);
        builder
            .push_sql("select id from users WHERE name = ")
            .push_bind(json!("Al"))
            .push_sql(" AND age = ")
            .push_bind(json!(40));

        let statement = builder.finish();
        assert_eq!(
            statement.sql(),
            "select id from users WHERE name = $p0 AND age = $p1"
        );
        assert_eq!(
            statement.render().unwrap(),
            "select id from users WHERE name = 'Al' AND age = 40"
        );
    }

    #[test]
    fn test_named_bind() {
        let statement = Statement::query("select * from t WHERE id = $id").bind("id", 7);
        assert_eq!(statement.render().unwrap(), "select * from t WHERE id = 7");
        assert_eq!(statement.kind(), StatementKind::Query);
    }

    #[test]
    fn test_unbound_sql_renders_verbatim() {
        let statement = Statement::query("select 'price in $USD' AS s, $1 AS dollar");
        assert_eq!(
            statement.render().unwrap(),
            "select 'price in $USD' AS s, $1 AS dollar"
        );
    }

    #[test]
    fn test_render_missing_parameter() {
        let statement = Statement::command("delete from t WHERE id = $id").bind("other", 1);
        assert!(matches!(
            statement.render(),
            Err(SqlError::Substitution(_))
        ));
    }
}

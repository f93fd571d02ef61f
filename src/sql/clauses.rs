//! Filter values and the WHERE-fragment generator.
//!
//! Each filter is a (column, value) pair; the value's shape decides the
//! predicate:
//!
//! | value            | fragment                          |
//! |------------------|-----------------------------------|
//! | text             | `col = 'v'`                       |
//! | null             | `col is null`                     |
//! | integer / float  | `col = v`                         |
//! | boolean          | `col = 1` / `col = 0`             |
//! | between / before / after | `col BETWEEN 'a' AND 'b'`, `col < 'a'`, `col > 'a'` |
//! | list             | `col IN (v1, v2, ...)`            |
//!
//! Fragments are joined with ` AND `. Literals are bound parameters and only
//! become text when the statement is rendered.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

use super::errors::SqlError;
use super::identifiers::checked_identifier;
use super::statement::{Statement, StatementBuilder, StatementKind};

/// A bound of a date range, kept in its SQL string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBound(String);

impl DateBound {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DateBound {
    fn from(value: &str) -> Self {
        DateBound(value.to_string())
    }
}

impl From<String> for DateBound {
    fn from(value: String) -> Self {
        DateBound(value)
    }
}

impl From<NaiveDate> for DateBound {
    fn from(value: NaiveDate) -> Self {
        DateBound(value.format("%Y-%m-%d").to_string())
    }
}

impl From<NaiveDateTime> for DateBound {
    fn from(value: NaiveDateTime) -> Self {
        DateBound(value.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DateBound
where
    Tz::Offset: std::fmt::Display,
{
    fn from(value: DateTime<Tz>) -> Self {
        DateBound(value.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRange {
    Between(DateBound, DateBound),
    Before(DateBound),
    After(DateBound),
}

impl DateRange {
    pub fn between(start: impl Into<DateBound>, end: impl Into<DateBound>) -> Self {
        DateRange::Between(start.into(), end.into())
    }

    pub fn before(bound: impl Into<DateBound>) -> Self {
        DateRange::Before(bound.into())
    }

    pub fn after(bound: impl Into<DateBound>) -> Self {
        DateRange::After(bound.into())
    }
}

/// Element of a membership list.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Range(DateRange),
    List(Vec<Scalar>),
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident via $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant($conv(value))
                }
            }

            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::$variant($conv(value))
                }
            }
        )*
    };
}

impl_from_scalar! {
    &str => Text via |v: &str| v.to_string(),
    String => Text via |v: String| v,
    i64 => Integer via |v: i64| v,
    i32 => Integer via i64::from,
    u32 => Integer via i64::from,
    f64 => Float via |v: f64| v,
    bool => Boolean via |v: bool| v,
}

impl From<DateRange> for FilterValue {
    fn from(value: DateRange) -> Self {
        FilterValue::Range(value)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FilterValue::Null)
    }
}

impl FilterValue {
    /// Interpret a JSON value as a filter. Shapes with no predicate form
    /// (nested lists, objects without a range key) are rejected.
    pub fn from_json(column: &str, value: &Value) -> Result<Self, SqlError> {
        let unsupported = || SqlError::UnsupportedFilterValue {
            column: column.to_string(),
            shape: value.to_string(),
        };

        match value {
            Value::String(s) => Ok(FilterValue::Text(s.clone())),
            Value::Null => Ok(FilterValue::Null),
            Value::Bool(b) => Ok(FilterValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(FilterValue::Integer(i)),
                None => n.as_f64().map(FilterValue::Float).ok_or_else(unsupported),
            },
            Value::Object(map) => {
                if let Some(bounds) = map.get("between") {
                    match bounds.as_array().map(Vec::as_slice) {
                        Some([start, end]) => Ok(FilterValue::Range(DateRange::between(
                            json_bound(start).ok_or_else(unsupported)?,
                            json_bound(end).ok_or_else(unsupported)?,
                        ))),
                        _ => Err(unsupported()),
                    }
                } else if let Some(bound) = map.get("before") {
                    Ok(FilterValue::Range(DateRange::before(
                        json_bound(bound).ok_or_else(unsupported)?,
                    )))
                } else if let Some(bound) = map.get("after") {
                    Ok(FilterValue::Range(DateRange::after(
                        json_bound(bound).ok_or_else(unsupported)?,
                    )))
                } else {
                    Err(unsupported())
                }
            }
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(Scalar::Text(s.clone())),
                    Value::Bool(b) => Ok(Scalar::Boolean(*b)),
                    Value::Number(n) => match n.as_i64() {
                        Some(i) => Ok(Scalar::Integer(i)),
                        None => n.as_f64().map(Scalar::Float).ok_or_else(unsupported),
                    },
                    _ => Err(unsupported()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FilterValue::List),
        }
    }
}

fn json_bound(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ordered set of column filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.push((column.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Build filters from a JSON object, preserving key order.
    pub fn from_json(value: &Value) -> Result<Self, SqlError> {
        let map = value
            .as_object()
            .ok_or_else(|| SqlError::FiltersNotAnObject(value.to_string()))?;
        let mut filters = Filters::new();
        for (column, value) in map {
            filters.push(column.clone(), FilterValue::from_json(column, value)?);
        }
        Ok(filters)
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (column, value) in iter {
            filters.push(column, value);
        }
        filters
    }
}

fn scalar_value(column: &str, scalar: &Scalar) -> Result<Value, SqlError> {
    match scalar {
        Scalar::Text(s) => Ok(Value::String(s.clone())),
        Scalar::Integer(i) => Ok(Value::from(*i)),
        Scalar::Float(f) => finite_float(column, *f),
        Scalar::Boolean(b) => Ok(Value::Bool(*b)),
    }
}

fn finite_float(column: &str, value: f64) -> Result<Value, SqlError> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| SqlError::UnsupportedFilterValue {
            column: column.to_string(),
            shape: format!("non-finite float {}", value),
        })
}

/// Append the predicates for `filters` to `builder`, joined with ` AND `.
pub fn write_clauses(
    builder: &mut StatementBuilder,
    filters: &Filters,
    sanitize: bool,
) -> Result<(), SqlError> {
    for (index, (column, value)) in filters.iter().enumerate() {
        if index > 0 {
            builder.push_sql(" AND ");
        }
        let column = checked_identifier(column, sanitize)?;

        match value {
            FilterValue::Text(s) => {
                builder
                    .push_sql(&format!("{} = ", column))
                    .push_bind(Value::String(s.clone()));
            }
            FilterValue::Null => {
                builder.push_sql(&format!("{} is null", column));
            }
            FilterValue::Integer(i) => {
                builder
                    .push_sql(&format!("{} = ", column))
                    .push_bind(Value::from(*i));
            }
            FilterValue::Float(f) => {
                let bound = finite_float(column, *f)?;
                builder.push_sql(&format!("{} = ", column)).push_bind(bound);
            }
            FilterValue::Boolean(b) => {
                builder
                    .push_sql(&format!("{} = ", column))
                    .push_bind(Value::Bool(*b));
            }
            FilterValue::Range(DateRange::Between(start, end)) => {
                builder
                    .push_sql(&format!("{} BETWEEN ", column))
                    .push_bind(Value::String(start.as_str().to_string()))
                    .push_sql(" AND ")
                    .push_bind(Value::String(end.as_str().to_string()));
            }
            FilterValue::Range(DateRange::Before(bound)) => {
                builder
                    .push_sql(&format!("{} < ", column))
                    .push_bind(Value::String(bound.as_str().to_string()));
            }
            FilterValue::Range(DateRange::After(bound)) => {
                builder
                    .push_sql(&format!("{} > ", column))
                    .push_bind(Value::String(bound.as_str().to_string()));
            }
            FilterValue::List(items) if items.is_empty() => {
                // Nothing is a member of the empty set
                builder.push_sql("1 = 0");
            }
            FilterValue::List(items) => {
                let placeholders = items
                    .iter()
                    .map(|item| -> Result<String, SqlError> { Ok(builder.bind(scalar_value(column, item)?)) })
                    .collect::<Result<Vec<_>, SqlError>>()?;
                builder.push_sql(&format!("{} IN ({})", column, placeholders.join(", ")));
            }
        }
    }
    Ok(())
}

/// Standalone predicate fragment for `filters`.
pub fn generate_clauses(filters: &Filters) -> Result<Statement, SqlError> {
    let mut builder = StatementBuilder::new(StatementKind::Query);
    write_clauses(&mut builder, filters, true)?;
    Ok(builder.finish())
}

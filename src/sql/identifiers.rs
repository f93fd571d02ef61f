//! Identifier checks for table and column names.
//!
//! Values are always bound, but identifiers have to be spliced into the SQL
//! text. With sanitization on, anything that is not a plain identifier is
//! rejected before a statement is built.

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::SqlError;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Returns the identifier unchanged, or an error when sanitization is on and
/// the name is not a plain identifier.
pub fn checked_identifier(name: &str, sanitize: bool) -> Result<&str, SqlError> {
    if sanitize && !is_valid_identifier(name) {
        return Err(SqlError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}

/// `database.middleware.table`, or `database.table` when the middleware
/// segment is empty.
pub fn qualified_table(
    database: &str,
    middleware: &str,
    table: &str,
    sanitize: bool,
) -> Result<String, SqlError> {
    let database = checked_identifier(database, sanitize)?;
    let table = checked_identifier(table, sanitize)?;
    if middleware.is_empty() {
        Ok(format!("{}.{}", database, table))
    } else {
        let middleware = checked_identifier(middleware, sanitize)?;
        Ok(format!("{}.{}.{}", database, middleware, table))
    }
}

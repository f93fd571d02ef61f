use thiserror::Error;

use super::parameter_substitution::ParameterSubstitutionError;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("Invalid SQL identifier '{0}' (allowed: letters, digits, underscore; must not start with a digit)")]
    InvalidIdentifier(String),
    #[error("Unsupported filter value for column '{column}': {shape}")]
    UnsupportedFilterValue { column: String, shape: String },
    #[error("Filter set must be a JSON object, got: {0}")]
    FiltersNotAnObject(String),
    #[error("Parameter substitution failed: {0}")]
    Substitution(#[from] ParameterSubstitutionError),
}

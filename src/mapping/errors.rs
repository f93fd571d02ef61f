use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("No database mapping found for {entity} ({missing} is not set)")]
    MissingMapping {
        entity: &'static str,
        missing: &'static str,
    },
    #[error("No key columns declared for {entity} (declare a primary, foreign or composite key)")]
    MissingKey { entity: &'static str },
    #[error("Field '{field}' of {entity} rejected value: {source}")]
    FieldValue {
        entity: &'static str,
        field: String,
        source: serde_json::Error,
    },
}

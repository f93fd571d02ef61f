use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::mapping::MappingPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Warehouse connection and mapping behaviour, read once at startup.
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Warehouse endpoint (account URL)
    #[validate(length(min = 1, message = "Warehouse URL cannot be empty"))]
    pub url: String,

    #[validate(length(min = 1, message = "Warehouse user cannot be empty"))]
    pub user: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Server used by entities that do not declare one
    pub default_server: String,

    /// Namespace between database and table (`db.<middleware>.table`)
    pub default_middleware: String,

    /// Per-statement execution timeout in seconds
    #[validate(range(
        min = 1,
        max = 3600,
        message = "Query timeout must be between 1 and 3600 seconds"
    ))]
    pub query_timeout_secs: u64,

    /// Keep a warehouse session open between statements
    pub session_keep_alive: bool,

    pub ignore_underscore_fields: bool,

    pub override_underscore_with_property: bool,

    /// Strict identifier validation. Literal values are always bound.
    pub sanitize_queries: bool,

    /// Assign a generated key on insert when the primary key is unset
    pub auto_generate_primary_key: bool,

    pub override_string_representation: bool,

    #[validate(range(
        min = 1,
        max = 256,
        message = "Primary key length must be between 1 and 256"
    ))]
    pub primary_key_length: usize,

    /// Appended as `ENGINE = ...` to generated `create table` statements
    pub table_engine: Option<String>,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: String::new(),
            default_server: String::new(),
            default_middleware: String::new(),
            query_timeout_secs: 5,
            session_keep_alive: true,
            ignore_underscore_fields: true,
            override_underscore_with_property: true,
            sanitize_queries: true,
            auto_generate_primary_key: true,
            override_string_representation: true,
            primary_key_length: 32,
            table_engine: None,
        }
    }
}

impl OrmConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            url: env::var("TABLEMAP_URL").unwrap_or(defaults.url),
            user: env::var("TABLEMAP_USER").unwrap_or(defaults.user),
            password: env::var("TABLEMAP_PASSWORD").unwrap_or_default(),
            default_server: env::var("TABLEMAP_DEFAULT_SERVER").unwrap_or_default(),
            default_middleware: env::var("TABLEMAP_DEFAULT_MIDDLEWARE").unwrap_or_default(),
            query_timeout_secs: parse_env_var("TABLEMAP_QUERY_TIMEOUT_SECS", "5")?,
            session_keep_alive: parse_env_var("TABLEMAP_SESSION_KEEP_ALIVE", "true")?,
            ignore_underscore_fields: parse_env_var("TABLEMAP_IGNORE_UNDERSCORE_FIELDS", "true")?,
            override_underscore_with_property: parse_env_var(
                "TABLEMAP_OVERRIDE_UNDERSCORE_WITH_PROPERTY",
                "true",
            )?,
            sanitize_queries: parse_env_var("TABLEMAP_SANITIZE_QUERIES", "true")?,
            auto_generate_primary_key: parse_env_var("TABLEMAP_AUTO_GENERATE_PRIMARY_KEY", "true")?,
            override_string_representation: parse_env_var(
                "TABLEMAP_OVERRIDE_STRING_REPRESENTATION",
                "true",
            )?,
            primary_key_length: parse_env_var("TABLEMAP_PRIMARY_KEY_LENGTH", "32")?,
            table_engine: env::var("TABLEMAP_TABLE_ENGINE")
                .ok()
                .filter(|engine| !engine.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Private-field policy derived from the two underscore flags
    pub fn mapping_policy(&self) -> MappingPolicy {
        match (
            self.ignore_underscore_fields,
            self.override_underscore_with_property,
        ) {
            (false, _) => MappingPolicy::IncludeAll,
            (true, false) => MappingPolicy::ExcludePrivate,
            (true, true) => MappingPolicy::OverridePrivate,
        }
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

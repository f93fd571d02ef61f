//! Entity declarations.
//!
//! An entity is a plain struct with a compile-time field list ([`Fields`],
//! usually generated by [`entity_fields!`](crate::entity_fields)) and an
//! optional table declaration ([`Entity`]). Field values cross the mapping
//! boundary as `serde_json::Value`.
//!
//! ```ignore
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct User {
//!     id: Option<String>,
//!     name: Option<String>,
//!     _age: Option<i64>,
//! }
//!
//! tablemap::entity_fields!(User { id, name, _age });
//!
//! impl Entity for User {
//!     fn database() -> Option<&'static str> { Some("analytics") }
//!     fn table() -> Option<&'static str> { Some("users") }
//!     fn resource_map() -> &'static [MappingEntry] {
//!         &[MappingEntry::Key(KeyMarker::Primary, &["id"])]
//!     }
//! }
//! ```

use serde_json::Value;

use super::errors::MappingError;
use super::resolver::MappingPolicy;

/// Prefix marking a field as private to the struct.
pub const PRIVATE_MARKER: char = '_';

/// Role of a key declaration in a resource map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyMarker {
    Primary,
    Foreign,
    Composite,
}

impl KeyMarker {
    pub const ALL: [KeyMarker; 3] = [KeyMarker::Primary, KeyMarker::Foreign, KeyMarker::Composite];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMarker::Primary => "primary-key",
            KeyMarker::Foreign => "foreign-key",
            KeyMarker::Composite => "composite-key",
        }
    }
}

/// One entry of a declared resource map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingEntry {
    /// `column` is stored in `field`
    Column(&'static str, &'static str),
    /// The listed columns play the given key role
    Key(KeyMarker, &'static [&'static str]),
}

/// Compile-time field list with by-name access.
pub trait Fields {
    const FIELD_NAMES: &'static [&'static str];

    /// `Ok(None)` when the struct has no field called `name`.
    fn read_field(&self, name: &str) -> Result<Option<Value>, serde_json::Error>;

    /// `Ok(false)` when the struct has no field called `name`.
    fn write_field(&mut self, name: &str, value: Value) -> Result<bool, serde_json::Error>;
}

/// Table declaration of a mapped struct. Every item is optional; unset
/// server and middleware fall back to the configured defaults, unset database
/// or table make every operation fail with a mapping error.
pub trait Entity: Fields + Default + Send + Sync + 'static {
    fn server() -> Option<&'static str> {
        None
    }

    fn middleware() -> Option<&'static str> {
        None
    }

    fn database() -> Option<&'static str> {
        None
    }

    fn table() -> Option<&'static str> {
        None
    }

    fn resource_map() -> &'static [MappingEntry] {
        &[]
    }

    /// Short type name used in error messages.
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Implements [`Fields`] for a struct whose listed fields are
/// `Serialize + DeserializeOwned`.
#[macro_export]
macro_rules! entity_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::mapping::Fields for $ty {
            const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($field)),*];

            fn read_field(
                &self,
                name: &str,
            ) -> ::std::result::Result<
                ::std::option::Option<$crate::__private::serde_json::Value>,
                $crate::__private::serde_json::Error,
            > {
                match name {
                    $(stringify!($field) => {
                        $crate::__private::serde_json::to_value(&self.$field).map(Some)
                    })*
                    _ => Ok(None),
                }
            }

            fn write_field(
                &mut self,
                name: &str,
                value: $crate::__private::serde_json::Value,
            ) -> ::std::result::Result<bool, $crate::__private::serde_json::Error> {
                match name {
                    $(stringify!($field) => {
                        self.$field = $crate::__private::serde_json::from_value(value)?;
                        Ok(true)
                    })*
                    _ => {
                        let _ = value;
                        Ok(false)
                    }
                }
            }
        }
    };
}

pub fn is_private(name: &str) -> bool {
    name.starts_with(PRIVATE_MARKER)
}

/// Physical struct field backing the logical name `name`.
///
/// Under [`MappingPolicy::OverridePrivate`] a private `_name` field wins over
/// a public `name`. Otherwise the exact name is used, then a
/// case-insensitive match.
pub fn physical_field<E: Fields>(name: &str, policy: MappingPolicy) -> Option<&'static str> {
    if policy == MappingPolicy::OverridePrivate {
        let private = format!("{}{}", PRIVATE_MARKER, name);
        if let Some(field) = E::FIELD_NAMES
            .iter()
            .find(|f| f.eq_ignore_ascii_case(&private))
        {
            return Some(field);
        }
    }

    E::FIELD_NAMES
        .iter()
        .find(|f| **f == name)
        .or_else(|| E::FIELD_NAMES.iter().find(|f| f.eq_ignore_ascii_case(name)))
        .copied()
}

/// Current value of the logical field `name`, `None` if nothing backs it.
pub fn read_logical<E: Entity>(
    entity: &E,
    name: &str,
    policy: MappingPolicy,
) -> Result<Option<Value>, MappingError> {
    let Some(field) = physical_field::<E>(name, policy) else {
        return Ok(None);
    };
    entity
        .read_field(field)
        .map_err(|source| MappingError::FieldValue {
            entity: E::entity_name(),
            field: field.to_string(),
            source,
        })
}

/// Assign `value` to the logical field `name`. Returns `false` when no field
/// backs the name.
///
/// Text that does not fit the field's type is retried as a JSON literal, so
/// `"42"` lands in an integer field and `"true"` in a boolean one.
pub fn assign_logical<E: Entity>(
    entity: &mut E,
    name: &str,
    value: Value,
    policy: MappingPolicy,
) -> Result<bool, MappingError> {
    let Some(field) = physical_field::<E>(name, policy) else {
        log::debug!("{} has no field for '{}', skipping", E::entity_name(), name);
        return Ok(false);
    };

    let fallback = match &value {
        Value::String(text) => serde_json::from_str::<Value>(text).ok(),
        _ => None,
    };

    match entity.write_field(field, value) {
        Ok(written) => Ok(written),
        Err(source) => match fallback {
            Some(parsed) => entity
                .write_field(field, parsed)
                .map_err(|_| MappingError::FieldValue {
                    entity: E::entity_name(),
                    field: field.to_string(),
                    source,
                }),
            None => Err(MappingError::FieldValue {
                entity: E::entity_name(),
                field: field.to_string(),
                source,
            }),
        },
    }
}

/// Null, missing and empty-string values count as unset.
pub fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

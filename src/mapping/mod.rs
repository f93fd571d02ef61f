//! Field mapping: entity declarations and the resolver that turns them into
//! a table location plus column/field mapping.

pub mod entity;
pub mod errors;
pub mod resolver;

pub use entity::{
    assign_logical, is_private, is_unset, physical_field, read_logical, Entity, Fields, KeyMarker,
    MappingEntry, PRIVATE_MARKER,
};
pub use errors::MappingError;
pub use resolver::{
    resolve, resource_mapping, ColumnMapping, KeyDeclaration, MappingPolicy, ResolvedMapping,
    ResourceMapping,
};

//! SQL building blocks: parameterized statements, identifier checks and the
//! filter-to-predicate generator.

pub mod clauses;
pub mod errors;
pub mod identifiers;
pub mod parameter_substitution;
pub mod statement;

pub use clauses::{generate_clauses, write_clauses, DateBound, DateRange, FilterValue, Filters, Scalar};
pub use errors::SqlError;
pub use identifiers::{checked_identifier, qualified_table};
pub use statement::{Statement, StatementBuilder, StatementKind};

//! Unit tests - public API exercised without a warehouse
//!
//! Statements go to the in-memory recording provider, which keeps every
//! rendered statement and answers queries from canned rows.

mod common;
mod csv_import_tests;
mod filter_clause_tests;
mod mapping_resolution_tests;
mod repository_tests;

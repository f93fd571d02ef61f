//! Integration tests - require a running ClickHouse server
//!
//! Connection settings come from the TABLEMAP_* environment variables (or a
//! `.env` file). Run with `cargo test --test integration -- --ignored`.

mod clickhouse_repository_tests;

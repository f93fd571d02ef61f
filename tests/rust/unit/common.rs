use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tablemap::warehouse::RecordingProvider;
use tablemap::{Entity, KeyMarker, MappingEntry, OrmConfig, QueryExecutor, Repository, Row};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<String>,
    pub email: Option<String>,
    pub visits: i64,
    pub vip: bool,
    pub _region: Option<String>,
}

tablemap::entity_fields!(Customer { id, email, visits, vip, _region });

impl Entity for Customer {
    fn database() -> Option<&'static str> {
        Some("sales")
    }

    fn table() -> Option<&'static str> {
        Some("customers")
    }

    fn resource_map() -> &'static [MappingEntry] {
        &[MappingEntry::Key(KeyMarker::Primary, &["id"])]
    }
}

/// Declared mapping with upper-case warehouse columns.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: Option<String>,
    pub customer_id: Option<String>,
    pub amount: f64,
}

tablemap::entity_fields!(Invoice { number, customer_id, amount });

impl Entity for Invoice {
    fn server() -> Option<&'static str> {
        Some("billing_wh")
    }

    fn middleware() -> Option<&'static str> {
        Some("finance")
    }

    fn database() -> Option<&'static str> {
        Some("ledger")
    }

    fn table() -> Option<&'static str> {
        Some("invoices")
    }

    fn resource_map() -> &'static [MappingEntry] {
        &[
            MappingEntry::Key(KeyMarker::Primary, &["INVOICE_NO"]),
            MappingEntry::Key(KeyMarker::Foreign, &["CUSTOMER_ID"]),
            MappingEntry::Column("INVOICE_NO", "number"),
            MappingEntry::Column("CUSTOMER_ID", "customer_id"),
            MappingEntry::Column("AMOUNT", "amount"),
        ]
    }
}

/// No database or table declared.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Unplaced {
    pub id: Option<String>,
}

tablemap::entity_fields!(Unplaced { id });

impl Entity for Unplaced {}

pub fn config() -> OrmConfig {
    OrmConfig {
        default_server: "main_wh".to_string(),
        default_middleware: "public".to_string(),
        ..Default::default()
    }
}

pub fn repository_with(config: OrmConfig) -> (Repository, RecordingProvider) {
    let provider = RecordingProvider::new();
    let executor = Arc::new(QueryExecutor::new(
        Arc::new(provider.clone()),
        Duration::from_secs(5),
    ));
    (Repository::new(executor, config), provider)
}

pub fn repository() -> (Repository, RecordingProvider) {
    repository_with(config())
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

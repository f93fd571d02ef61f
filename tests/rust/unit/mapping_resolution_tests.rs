use super::common::{config, Customer, Invoice, Unplaced};
use tablemap::errors::OrmError;
use tablemap::mapping::{resolve, MappingError};
use tablemap::{KeyMarker, MappingPolicy, OrmConfig};
use test_case::test_case;

fn columns(config: &OrmConfig) -> Vec<String> {
    resolve::<Customer>(config)
        .unwrap()
        .mapping
        .columns()
        .iter()
        .map(|c| c.column.clone())
        .collect()
}

#[test_case(false, false, &["id", "email", "visits", "vip", "_region"] ; "private fields included")]
#[test_case(true, false, &["id", "email", "visits", "vip"] ; "private fields excluded")]
#[test_case(true, true, &["id", "email", "visits", "vip", "region"] ; "private fields renamed")]
fn test_policy_from_config(ignore: bool, override_private: bool, expected: &[&str]) {
    let config = OrmConfig {
        ignore_underscore_fields: ignore,
        override_underscore_with_property: override_private,
        ..config()
    };
    assert_eq!(columns(&config), expected);
}

#[test]
fn test_default_policy_is_override() {
    assert_eq!(config().mapping_policy(), MappingPolicy::OverridePrivate);
}

#[test]
fn test_declared_location_and_keys() {
    let resolved = resolve::<Invoice>(&config()).unwrap();
    assert_eq!(resolved.server, "billing_wh");
    assert_eq!(resolved.middleware, "finance");
    assert_eq!(resolved.database, "ledger");
    assert_eq!(resolved.table, "invoices");
    assert_eq!(resolved.mapping.primary_key_field(), Some("number"));
    assert_eq!(
        resolved.mapping.key(KeyMarker::Foreign).map(|k| k.columns.clone()),
        Some(vec!["CUSTOMER_ID".to_string()])
    );
}

#[test]
fn test_defaults_fill_server_and_middleware() {
    let resolved = resolve::<Customer>(&config()).unwrap();
    assert_eq!(resolved.server, "main_wh");
    assert_eq!(resolved.middleware, "public");
}

#[tokio::test]
async fn test_unplaced_entity_fails_every_operation() {
    let (repo, provider) = super::common::repository();
    let err = repo.get_all::<Unplaced>(None).await.unwrap_err();
    assert!(matches!(
        err,
        OrmError::Mapping(MappingError::MissingMapping {
            missing: "database",
            ..
        })
    ));
    assert!(repo.truncate::<Unplaced>().await.is_err());
    assert!(provider.sql().is_empty());
}

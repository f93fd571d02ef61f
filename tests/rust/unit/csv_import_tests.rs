use serde_json::json;
use tablemap::errors::OrmError;
use tablemap::mapping::MappingError;
use tablemap::serialization::{
    deserialize_from_csv, deserialize_from_json, serialize_to_html, serialize_to_json, OverrideMap,
};
use tablemap::{CsvImport, OrmConfig};

use super::common::{config, Customer, Invoice, Unplaced};

#[test]
fn test_header_row_is_not_an_entity() {
    let rows = vec![
        vec!["ID", "EMAIL", "VISITS", "VIP", "REGION"],
        vec!["c1", "a@b.c", "3", "true", "EU"],
    ];
    let import: CsvImport<Customer> = deserialize_from_csv(rows, None, &config()).unwrap();

    assert_eq!(import.entities.len(), 1);
    assert!(import.rejected.is_empty());
    let customer = &import.entities[0];
    assert_eq!(customer.id.as_deref(), Some("c1"));
    assert_eq!(customer.visits, 3);
    assert!(customer.vip);
    assert_eq!(customer._region.as_deref(), Some("EU"));
}

#[test]
fn test_declared_columns_and_overrides() {
    let overrides: OverrideMap = [("ref".to_string(), "number".to_string())].into();
    let rows = vec![
        vec!["ref".to_string(), "CUSTOMER_ID".to_string(), "AMOUNT".to_string()],
        vec!["INV-9".to_string(), "c1".to_string(), "19.99".to_string()],
        vec!["INV-10".to_string(), "c2".to_string(), "n/a".to_string()],
    ];
    let import: CsvImport<Invoice> = deserialize_from_csv(rows, Some(&overrides), &config()).unwrap();

    assert_eq!(import.entities.len(), 1);
    assert_eq!(import.entities[0].number.as_deref(), Some("INV-9"));
    assert_eq!(import.entities[0].amount, 19.99);
    assert_eq!(import.rejected.len(), 1);
    assert_eq!(import.rejected[0].line, 3);
    assert!(import.rejected[0].reason.contains("amount"));
}

#[test]
fn test_short_rows_are_rejected_with_line_numbers() {
    let rows = vec![vec!["id", "email"], vec!["c1"], vec!["c2", "x@y.z"], vec![]];
    let import: CsvImport<Customer> = deserialize_from_csv(rows, None, &config()).unwrap();

    assert_eq!(import.entities.len(), 1);
    assert_eq!(
        import.rejected.iter().map(|r| r.line).collect::<Vec<_>>(),
        vec![2, 4]
    );
}

#[test]
fn test_json_round_trip_through_declared_mapping() {
    let invoice = Invoice {
        number: Some("INV-3".to_string()),
        customer_id: Some("c9".to_string()),
        amount: 3.25,
    };
    let json = serialize_to_json(&invoice, &config()).unwrap();
    assert_eq!(
        serde_json::Value::Object(json.clone()),
        json!({"number": "INV-3", "customer_id": "c9", "amount": 3.25})
    );

    let mut copy = Invoice::default();
    deserialize_from_json(&mut copy, &json, None, &config()).unwrap();
    assert_eq!(copy, invoice);
}

#[test]
fn test_json_by_warehouse_column_names() {
    let data = json!({"INVOICE_NO": "INV-4", "amount": 1, "unknown": true});
    let mut invoice = Invoice::default();
    let assigned =
        deserialize_from_json(&mut invoice, data.as_object().unwrap(), None, &config()).unwrap();

    assert_eq!(assigned, 2);
    assert_eq!(invoice.number.as_deref(), Some("INV-4"));
    assert_eq!(invoice.amount, 1.0);
}

#[test]
fn test_html_placeholders() {
    let customer = Customer {
        email: Some("a&b@c.d".to_string()),
        visits: 2,
        ..Default::default()
    };
    let html = serialize_to_html(&customer, "<p>@email@ / @visits@ / @region@</p>", &config()).unwrap();
    assert_eq!(html, "<p>a&b@c.d / 2 / </p>");
}

#[test]
fn test_private_columns_follow_the_policy() {
    let excluding = OrmConfig {
        override_underscore_with_property: false,
        ..config()
    };
    let data = json!({"id": "c1", "region": "EU", "_region": "EU"});
    let mut customer = Customer::default();

    let assigned =
        deserialize_from_json(&mut customer, data.as_object().unwrap(), None, &excluding).unwrap();

    assert_eq!(assigned, 1);
    assert_eq!(customer._region, None);
}

#[test]
fn test_unplaced_entity_cannot_be_serialized() {
    let err = serialize_to_json(&Unplaced::default(), &config()).unwrap_err();
    assert!(matches!(
        err,
        OrmError::Mapping(MappingError::MissingMapping {
            missing: "database",
            ..
        })
    ));
}

use serde_json::json;
use tablemap::sql::{generate_clauses, SqlError};
use tablemap::{DateRange, FilterValue, Filters};
use test_case::test_case;

fn render(filters: &Filters) -> String {
    generate_clauses(filters).unwrap().render().unwrap()
}

#[test]
fn test_clauses_keep_insertion_order() {
    let filters = Filters::new()
        .with("status", "open")
        .with("priority", 2)
        .with("closed_at", FilterValue::Null)
        .with("flagged", false);
    assert_eq!(
        render(&filters),
        "status = 'open' AND priority = 2 AND closed_at is null AND flagged = 0"
    );
}

#[test_case(DateRange::between("2024-01-01", "2024-02-01"), "day BETWEEN '2024-01-01' AND '2024-02-01'" ; "between")]
#[test_case(DateRange::before("2024-01-01"), "day < '2024-01-01'" ; "before")]
#[test_case(DateRange::after("2024-01-01"), "day > '2024-01-01'" ; "after")]
fn test_date_ranges(range: DateRange, expected: &str) {
    assert_eq!(render(&Filters::new().with("day", range)), expected);
}

#[test]
fn test_filters_from_json_object() {
    let filters = Filters::from_json(&json!({
        "name": "Ann",
        "visits": 3,
        "vip": true,
        "region": null,
        "id": ["a", "b"]
    }))
    .unwrap();
    assert_eq!(filters.len(), 5);
    assert_eq!(
        render(&filters),
        "name = 'Ann' AND visits = 3 AND vip = 1 AND region is null AND id IN ('a', 'b')"
    );
}

#[test]
fn test_json_date_range_object() {
    let filters = Filters::from_json(&json!({"day": {"after": "2024-05-01"}})).unwrap();
    assert_eq!(render(&filters), "day > '2024-05-01'");
}

#[test]
fn test_json_that_is_not_an_object_is_rejected() {
    assert!(matches!(
        Filters::from_json(&json!(["a"])),
        Err(SqlError::FiltersNotAnObject(_))
    ));
}

#[test]
fn test_nested_list_value_is_rejected() {
    let err = Filters::from_json(&json!({"id": [["a"]]})).unwrap_err();
    assert!(matches!(err, SqlError::UnsupportedFilterValue { column, .. } if column == "id"));
}

#[test]
fn test_values_never_reach_sql_unescaped() {
    let filters = Filters::new().with("name", "x' OR '1'='1");
    assert_eq!(render(&filters), "name = 'x\\' OR \\'1\\'=\\'1'");
}

#[test]
fn test_hostile_column_is_rejected() {
    let filters = Filters::new().with("name = name --", "x");
    assert!(matches!(
        generate_clauses(&filters),
        Err(SqlError::InvalidIdentifier(_))
    ));
}

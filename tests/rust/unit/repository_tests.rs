use serde_json::json;
use tablemap::sql::StatementKind;
use tablemap::{Filters, Lookup, OrmConfig, Statement};

use super::common::{config, repository, repository_with, row, Customer, Invoice};

#[tokio::test]
async fn test_get_by_declared_columns() {
    let (repo, provider) = repository();
    provider.push_response(vec![row(json!({
        "number": "INV-1",
        "customer_id": "c1",
        "amount": 12.5
    }))]);

    let mut invoice = Invoice {
        number: Some("INV-1".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.get(&mut invoice, None).await.unwrap(), Lookup::Found);
    assert_eq!(invoice.amount, 12.5);
    assert_eq!(
        provider.sql(),
        vec![
            "select top 1 INVOICE_NO AS number, CUSTOMER_ID AS customer_id, AMOUNT AS amount \
             from ledger.finance.invoices WHERE INVOICE_NO = 'INV-1' AND CUSTOMER_ID is null"
        ]
    );
}

#[tokio::test]
async fn test_get_with_filters_overrides_keys() {
    let (repo, provider) = repository();
    let mut customer = Customer::default();
    let filters = Filters::new().with("email", "a@b.c");

    let lookup = repo.get(&mut customer, Some(&filters)).await.unwrap();

    assert!(!lookup.is_found());
    assert!(provider.sql()[0].ends_with("WHERE email = 'a@b.c'"));
}

#[tokio::test]
async fn test_get_all_coerces_text_columns() {
    let (repo, provider) = repository();
    provider.push_response(vec![row(json!({
        "id": "c1",
        "visits": "7",
        "vip": "true",
        "region": "EU"
    }))]);

    let customers: Vec<Customer> = repo.get_all(None).await.unwrap();

    assert_eq!(customers[0].visits, 7);
    assert!(customers[0].vip);
    assert_eq!(customers[0]._region.as_deref(), Some("EU"));
}

#[tokio::test]
async fn test_insert_key_length_follows_config() {
    let (repo, provider) = repository_with(OrmConfig {
        primary_key_length: 8,
        ..config()
    });
    let mut customer = Customer::default();

    repo.insert(&mut customer).await.unwrap();

    let key = customer.id.clone().unwrap();
    assert_eq!(key.len(), 8);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(provider.sql()[0].contains(&format!("'{}'", key)));
}

#[tokio::test]
async fn test_insert_without_auto_key_keeps_null() {
    let (repo, provider) = repository_with(OrmConfig {
        auto_generate_primary_key: false,
        ..config()
    });
    let mut customer = Customer::default();

    repo.insert(&mut customer).await.unwrap();

    assert_eq!(customer.id, None);
    assert_eq!(
        provider.sql(),
        vec!["insert into sales.public.customers (id, email, visits, vip, region) values ('', '', '0', 'false', '')"]
    );
}

#[tokio::test]
async fn test_delete_by_filters_and_commands_are_commands() {
    let (repo, provider) = repository();
    let filters = Filters::new().with("visits", 0);

    repo.delete(&Customer::default(), Some(&filters)).await.unwrap();

    let recorded = provider.statements();
    assert_eq!(recorded[0].sql, "delete from sales.public.customers WHERE visits = 0");
    assert_eq!(recorded[0].kind, StatementKind::Command);
}

#[tokio::test]
async fn test_create_table_with_engine() {
    let (repo, provider) = repository_with(OrmConfig {
        table_engine: Some("MergeTree ORDER BY id".to_string()),
        ..config()
    });

    repo.create_table::<Customer>().await.unwrap();

    assert_eq!(
        provider.sql(),
        vec![
            "create table if not exists sales.public.customers \
             (id VARCHAR, email VARCHAR, visits BIGINT, vip BOOLEAN, region VARCHAR) \
             ENGINE = MergeTree ORDER BY id"
        ]
    );
}

#[tokio::test]
async fn test_raw_query_binds_parameters() {
    let (repo, provider) = repository();
    provider.push_response(vec![row(json!({"ID": "c1", "EMAIL": "x@y.z"}))]);

    let statement = Statement::query("select * from sales.public.customers where visits > $min")
        .bind("min", 3);
    let customers: Vec<Customer> = repo.get_all_from_query(&statement).await.unwrap();

    assert_eq!(customers[0].email.as_deref(), Some("x@y.z"));
    assert_eq!(
        provider.sql(),
        vec!["select * from sales.public.customers where visits > 3"]
    );
}

#[tokio::test]
async fn test_every_cursor_is_closed() {
    let (repo, provider) = repository();
    provider.push_response(vec![row(json!({"id": "c1", "visits": "many"}))]);

    assert!(repo.get_all::<Customer>(None).await.is_err());
    repo.truncate::<Customer>().await.unwrap();

    assert_eq!(provider.open_cursors(), 0);
    assert_eq!(provider.connect_count(), 1);
}

#[tokio::test]
async fn test_raw_sql_keeps_dollar_signs_in_literals() {
    let (repo, provider) = repository();
    provider.push_response(vec![row(json!({"s": "price in $USD"}))]);

    let rows = repo
        .executor()
        .execute(&Statement::query("select 'price in $USD' as s"), None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(provider.sql(), vec!["select 'price in $USD' as s"]);
}

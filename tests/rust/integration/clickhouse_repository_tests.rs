use serde::{Deserialize, Serialize};
use serial_test::serial;
use tablemap::{Entity, Filters, KeyMarker, Lookup, MappingEntry, OrmConfig, Repository, Statement};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Visit {
    id: Option<String>,
    label: Option<String>,
    hits: i64,
}

tablemap::entity_fields!(Visit { id, label, hits });

impl Entity for Visit {
    fn database() -> Option<&'static str> {
        Some("default")
    }

    fn table() -> Option<&'static str> {
        Some("tablemap_visits")
    }

    fn resource_map() -> &'static [MappingEntry] {
        &[MappingEntry::Key(KeyMarker::Primary, &["id"])]
    }
}

fn repository() -> Repository {
    dotenvy::dotenv().ok();
    let config = OrmConfig {
        default_server: "clickhouse".to_string(),
        table_engine: Some("MergeTree ORDER BY id".to_string()),
        ..OrmConfig::from_env().unwrap()
    };
    Repository::clickhouse(config)
}

#[tokio::test]
#[serial]
#[ignore = "requires a running ClickHouse server"]
async fn test_table_lifecycle() {
    let repo = repository();
    repo.drop_table::<Visit>().await.unwrap();
    repo.create_table::<Visit>().await.unwrap();

    let mut visit = Visit {
        label: Some("first".to_string()),
        hits: 3,
        ..Default::default()
    };
    repo.insert(&mut visit).await.unwrap();
    assert_eq!(visit.id.as_ref().map(String::len), Some(32));

    let mut loaded = Visit {
        id: visit.id.clone(),
        ..Default::default()
    };
    assert_eq!(repo.get(&mut loaded, None).await.unwrap(), Lookup::Found);
    assert_eq!(loaded, visit);

    let all: Vec<Visit> = repo
        .get_all(Some(&Filters::new().with("label", "first")))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    repo.drop_table::<Visit>().await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires a running ClickHouse server"]
async fn test_async_submission() {
    let repo = repository();
    let rows = repo
        .executor()
        .execute(&Statement::query("select 1 AS one"), None)
        .await
        .unwrap();
    assert_eq!(rows[0].get("one"), Some(&serde_json::json!(1)));

    let handle = repo
        .executor()
        .execute_async(&Statement::query("select 2 AS two"), None)
        .await
        .unwrap();
    let rows = repo.executor().fetch_async_result(&handle).await.unwrap();
    assert_eq!(rows[0].get("two"), Some(&serde_json::json!(2)));
}

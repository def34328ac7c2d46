use rstest::rstest;
use searchlayer::{memory::InMemorySearch, prelude::*};
use serde_json::{Value, json};

fn user_definition() -> ModelDefinition {
    ModelDefinition::new(
        "User",
        PropertySchema::new()
            .field("id", FieldType::String)
            .field("name", FieldType::String)
            .field("age", FieldType::Number)
            .field("tags", FieldType::Array),
    )
}

async fn connector() -> Connector<InMemorySearch> {
    let connector = Connector::new(
        InMemorySearch::builder().build().await.unwrap(),
        ConnectorSettings::default(),
    );
    connector.define(user_definition()).await;
    connector
}

fn where_clause(value: Value) -> WhereClause {
    match value {
        Value::Object(map) => map,
        _ => panic!("where clause must be an object"),
    }
}

#[tokio::test]
async fn connect_is_idempotent() {
    let connector = connector().await;
    assert!(!connector.is_connected().await);

    connector.connect().await.unwrap();
    connector.connect().await.unwrap();

    assert!(connector.is_connected().await);
    connector.ping().await.unwrap();
    connector.disconnect().await.unwrap();
}

#[tokio::test]
async fn create_find_and_destroy() {
    let connector = connector().await;

    let id = connector
        .create("User", json!({ "name": "Alice", "age": "42", "unknown": true }))
        .await
        .unwrap();

    let record = connector.find("User", id.clone()).await.unwrap().unwrap();
    assert_eq!(record.get("id").and_then(FieldValue::as_str), Some(id.as_str()));
    assert_eq!(record.get("name").and_then(FieldValue::as_str), Some("Alice"));
    assert_eq!(record.get("age").and_then(FieldValue::as_f64), Some(42.0));
    assert!(!record.contains("unknown"));
    assert!(!record.contains("tags"));

    assert!(connector.exists("User", id.clone()).await.unwrap());
    assert!(connector.destroy("User", id.clone()).await.unwrap());
    assert!(!connector.exists("User", id.clone()).await.unwrap());
    assert_eq!(connector.find("User", id).await.unwrap(), None);
}

#[tokio::test]
async fn numeric_ids_are_coerced_to_strings() {
    let connector = connector().await;

    let id = connector.create("User", json!({ "id": 7, "name": "Bob" })).await.unwrap();
    assert_eq!(id, "7");

    assert!(connector.exists("User", 7).await.unwrap());
    assert!(connector.exists("User", "7").await.unwrap());
}

#[tokio::test]
async fn save_replaces_the_whole_document() {
    let connector = connector().await;
    let id = connector
        .create("User", json!({ "id": "u1", "name": "Alice", "age": 30 }))
        .await
        .unwrap();

    connector.save("User", json!({ "id": id, "name": "Alicia" })).await.unwrap();

    let record = connector.find("User", "u1").await.unwrap().unwrap();
    assert_eq!(record.to_json(), json!({ "id": "u1", "name": "Alicia" }));
}

#[tokio::test]
async fn update_or_create_returns_the_mapped_record() {
    let connector = connector().await;

    let created = connector
        .update_or_create("User", json!({ "name": "Carol", "tags": [] }))
        .await
        .unwrap();
    assert!(created.contains("id"));
    assert_eq!(created.get("tags").and_then(FieldValue::as_array), Some(&[][..]));
    assert_eq!(connector.count("User", None).await.unwrap(), 1);

    let id = created.get("id").and_then(FieldValue::as_str).unwrap().to_string();
    let updated = connector
        .update_or_create("User", json!({ "id": id, "name": "Caroline" }))
        .await
        .unwrap();

    assert_eq!(updated.get("name").and_then(FieldValue::as_str), Some("Caroline"));
    assert_eq!(connector.count("User", None).await.unwrap(), 1);
}

#[tokio::test]
async fn all_filters_and_paginates() {
    let connector = connector().await;
    for (n, role) in ["admin", "guest", "admin", "guest", "admin"].iter().enumerate() {
        connector
            .create("User", json!({ "id": format!("u{}", n), "name": role }))
            .await
            .unwrap();
    }

    let admins = connector
        .all("User", Some(&Criteria::builder().where_eq("name", "admin").build()))
        .await
        .unwrap();
    let ids = admins
        .iter()
        .filter_map(|record| record.get("id").and_then(FieldValue::as_str))
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["u0", "u2", "u4"]);

    let page = connector
        .all("User", Some(&Criteria::builder().limit(2).skip(1).build()))
        .await
        .unwrap();
    let ids = page
        .iter()
        .filter_map(|record| record.get("id").and_then(FieldValue::as_str))
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["u1", "u2"]);
}

#[tokio::test]
async fn all_accepts_deserialized_filter_objects() {
    let connector = connector().await;
    connector.create("User", json!({ "name": "Dave", "age": 50 })).await.unwrap();
    connector.create("User", json!({ "name": "Erin", "age": 20 })).await.unwrap();

    let criteria: Criteria = serde_json::from_value(json!({
        "where": { "age": 50 },
        "limit": 10,
        "order": "name ASC"
    }))
    .unwrap();

    let records = connector.all("User", Some(&criteria)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name").and_then(FieldValue::as_str), Some("Dave"));
}

#[tokio::test]
async fn native_query_takes_precedence_over_where() {
    let connector = connector().await;
    connector.create("User", json!({ "name": "Frank" })).await.unwrap();
    connector.create("User", json!({ "name": "Grace" })).await.unwrap();

    let criteria = Criteria::builder()
        .native(json!({ "query": { "term": { "name": "Grace" } } }))
        .where_eq("name", "Frank")
        .build();

    let records = connector.all("User", Some(&criteria)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name").and_then(FieldValue::as_str), Some("Grace"));
}

#[tokio::test]
async fn count_and_destroy_all_with_where() {
    let connector = connector().await;
    connector.create("User", json!({ "name": "Heidi", "tags": ["x"] })).await.unwrap();
    connector.create("User", json!({ "name": "Ivan" })).await.unwrap();
    connector.create("User", json!({ "name": "Heidi" })).await.unwrap();

    let heidi = where_clause(json!({ "name": "Heidi" }));
    assert_eq!(connector.count("User", Some(&heidi)).await.unwrap(), 2);
    assert_eq!(connector.count("User", None).await.unwrap(), 3);

    assert_eq!(connector.destroy_all("User", Some(&heidi)).await.unwrap(), 2);
    assert_eq!(connector.count("User", None).await.unwrap(), 1);

    assert_eq!(connector.destroy_all("User", None).await.unwrap(), 1);
    assert_eq!(connector.count("User", None).await.unwrap(), 0);
}

#[tokio::test]
async fn array_fields_collapse_into_one_joined_entry() {
    let connector = connector().await;
    let id = connector
        .create("User", json!({ "name": "Judy", "tags": ["a", "b"] }))
        .await
        .unwrap();

    let record = connector.find("User", id).await.unwrap().unwrap();
    assert_eq!(
        record.get("tags").and_then(FieldValue::as_array),
        Some(&["a,b".to_string()][..])
    );
}

#[tokio::test]
async fn shared_index_keeps_models_apart() {
    let connector = Connector::new(
        InMemorySearch::new(),
        ConnectorSettings { index: Some("shop".to_string()), ..ConnectorSettings::default() },
    );
    connector.define(user_definition()).await;
    connector
        .define(ModelDefinition::new("Order", PropertySchema::new().field("total", FieldType::Number)))
        .await;

    connector.create("User", json!({ "name": "Mallory" })).await.unwrap();
    connector.create("Order", json!({ "total": 12 })).await.unwrap();

    assert_eq!(connector.count("User", None).await.unwrap(), 1);
    assert_eq!(connector.count("Order", None).await.unwrap(), 1);
    assert_eq!(connector.backend().list_indices().await, vec!["shop".to_string()]);
}

#[tokio::test]
async fn default_size_applies_only_to_non_positive_limits() {
    let connector = Connector::new(
        InMemorySearch::new(),
        ConnectorSettings { default_size: Some(3), ..ConnectorSettings::default() },
    );
    connector.define(user_definition()).await;
    for n in 0..5 {
        connector.create("User", json!({ "name": format!("user{}", n) })).await.unwrap();
    }

    let zero_limit = Criteria::builder().limit(0).build();
    assert_eq!(connector.all("User", Some(&zero_limit)).await.unwrap().len(), 3);

    let explicit = Criteria::builder().limit(4).build();
    assert_eq!(connector.all("User", Some(&explicit)).await.unwrap().len(), 4);

    assert_eq!(connector.all("User", None).await.unwrap().len(), 5);
}

#[rstest]
#[case::null_id(Value::Null)]
#[tokio::test]
async fn null_id_is_missing(#[case] id: Value) {
    let connector = connector().await;

    assert!(matches!(
        connector.find("User", id.clone()).await,
        Err(SearchLayerError::MissingIdentifier(_))
    ));
    assert!(matches!(
        connector.destroy("User", id).await,
        Err(SearchLayerError::MissingIdentifier(_))
    ));
    assert!(matches!(
        connector.save("User", json!({ "name": "NoId" })).await,
        Err(SearchLayerError::MissingIdentifier(_))
    ));
}

#[rstest]
#[case::object(json!({ "nested": 1 }))]
#[case::array(json!([1, 2]))]
#[tokio::test]
async fn structured_ids_are_invalid(#[case] id: Value) {
    let connector = connector().await;

    assert!(matches!(
        connector.exists("User", id).await,
        Err(SearchLayerError::InvalidIdentifier(_))
    ));
}

#[tokio::test]
async fn misuse_is_reported() {
    let connector = connector().await;

    assert!(matches!(
        connector.create("Ghost", json!({})).await,
        Err(SearchLayerError::ModelNotFound(_))
    ));
    assert!(matches!(
        connector.create("User", json!(["not", "an", "object"])).await,
        Err(SearchLayerError::InvalidDocument(_))
    ));
    assert!(matches!(
        connector.update_attributes("User", "u1", json!({ "name": "x" })).await,
        Err(SearchLayerError::Unsupported(_))
    ));
}

#[tokio::test]
async fn unsupported_native_queries_are_backend_errors() {
    let connector = connector().await;
    let criteria = Criteria::from_native(json!({ "query": { "range": { "age": { "gte": 1 } } } }));

    assert!(matches!(
        connector.all("User", Some(&criteria)).await,
        Err(SearchLayerError::Backend(_))
    ));
}

#[tokio::test]
async fn dynamic_connector_behaves_the_same() {
    let connector = connector().await.into_dyn();
    connector.connect().await.unwrap();

    let id = connector.create("User", json!({ "name": "Niaj" })).await.unwrap();
    assert!(connector.exists("User", id.clone()).await.unwrap());

    let backend = (**connector.backend())
        .as_any()
        .downcast_ref::<InMemorySearch>()
        .unwrap();
    assert_eq!(backend.list_indices().await, vec!["user".to_string()]);

    connector.disconnect().await.unwrap();
}

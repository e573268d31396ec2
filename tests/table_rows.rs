//! Table profile against service-shaped responses.

use dataapi_serdes::{
    CamelSnakeCase, Codec, ColumnType, SerDesConfig, TableSchema, TableSerDes, Value, Verb,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn projection(json: serde_json::Value) -> TableSchema {
    TableSchema::from_projection(&json).unwrap()
}

#[test]
fn dense_and_sparse_rows() {
    let schema = projection(json!({
        "a": { "type": "int" },
        "b": { "type": "map", "keyType": "text", "valueType": "text" }
    }));

    let dense = TableSerDes::new()
        .deserialize(&Value::from(json!({})), &schema)
        .unwrap();
    assert_eq!(dense.get("a"), Some(&Value::Null));
    assert_eq!(dense.get("b"), Some(&Value::Map(vec![])));

    let sparse = TableSerDes::builder()
        .sparse_data(true)
        .build()
        .deserialize(&Value::from(json!({})), &schema)
        .unwrap();
    assert_eq!(sparse.as_object().map(|o| o.len()), Some(0));
}

#[test]
fn present_columns_decode_and_absent_ones_default() {
    let schema = projection(json!({
        "text": { "type": "text" },
        "int": { "type": "int" },
        "ts": { "type": "timestamp" }
    }));
    let row = TableSerDes::new()
        .deserialize(&Value::from(json!({ "text": "123", "int": 0 })), &schema)
        .unwrap();
    assert_eq!(row.get("text"), Some(&Value::from("123")));
    assert_eq!(row.get("int"), Some(&Value::from(0)));
    assert_eq!(row.get("ts"), Some(&Value::Null));
}

#[test]
fn full_row_round_trip() {
    let schema = projection(json!({
        "id": { "type": "uuid" },
        "name": { "type": "text" },
        "balance": { "type": "decimal" },
        "population": { "type": "varint" },
        "score": { "type": "double" },
        "seen": { "type": "timestamp" },
        "tags": { "type": "set", "valueType": "text" },
        "attrs": { "type": "map", "keyType": "text", "valueType": "int" },
        "history": { "type": "list", "valueType": "timestamp" },
        "embedding": { "type": "vector", "dimension": 2 },
        "raw": { "type": "blob" }
    }));
    let wire = Value::from_json_str(
        r#"{
            "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "name": "row",
            "balance": 12345678901234567890.000001,
            "population": 98765432109876543210,
            "score": "-Infinity",
            "seen": "2024-05-06T07:08:09.123Z",
            "tags": ["x", "y"],
            "attrs": {"k": 1},
            "history": ["2024-05-06T07:08:09.123Z"],
            "embedding": {"$binary": "P4AAAD+AAAA="},
            "raw": {"$binary": "AQID"}
        }"#,
    )
    .unwrap();

    let serdes = TableSerDes::new();
    let host = serdes.deserialize(&wire, &schema).unwrap();
    assert!(matches!(host.get("balance"), Some(Value::Decimal(_))));
    assert!(matches!(host.get("population"), Some(Value::BigInt(_))));
    assert!(matches!(host.get("tags"), Some(Value::Set(items)) if items.len() == 2));
    assert_eq!(
        host.get("embedding"),
        Some(&Value::Vector(vec![1.0f32, 1.0].into()))
    );

    let back = serdes.serialize(&host).unwrap();
    assert!(back.big_numbers);
    let again = serdes
        .deserialize(
            &Value::from_json_str(&back.to_json_string().unwrap()).unwrap(),
            &schema,
        )
        .unwrap();
    assert_eq!(again, host);
}

#[test]
fn primary_keys_follow_schema_order() {
    let serdes = TableSerDes::builder()
        .key_transformer(CamelSnakeCase::new())
        .build();
    let key_schema = projection(json!({
        "user_id": { "type": "uuid" },
        "created_at": { "type": "timestamp" }
    }));
    let key = serdes
        .deserialize_primary_key(
            &[
                Value::from("6ba7b810-9dad-11d1-80b4-00c04fd430c8"),
                Value::from("2024-01-01T00:00:00Z"),
            ],
            &key_schema,
        )
        .unwrap();
    let names: Vec<_> = key.as_object().unwrap().keys().cloned().collect();
    assert_eq!(names, vec!["userId", "createdAt"]);
    assert!(matches!(key.get("createdAt"), Some(Value::Timestamp(_))));
}

#[test]
fn column_type_codecs_can_be_overridden() {
    let serdes = TableSerDes::builder()
        .codec(Codec::for_type("timestamp").deserialize(|_, value, _| {
            Ok(Verb::Done(Value::from(format!(
                "at {}",
                value.as_str().unwrap_or_default()
            ))))
        }))
        .build();
    let schema = TableSchema::new().with_column("ts", ColumnType::scalar("timestamp"));
    let row = serdes
        .deserialize(&Value::from(json!({ "ts": "2024-01-01T00:00:00Z" })), &schema)
        .unwrap();
    assert_eq!(row.get("ts"), Some(&Value::from("at 2024-01-01T00:00:00Z")));
}

#[test]
fn yaml_config_drives_the_table_profile() {
    let config = SerDesConfig::from_yaml_str(
        r#"
sparse_data: true
key_case: snake_case
numeric:
  "*": string
"#,
    )
    .unwrap();
    let serdes = config.table_builder().unwrap().build();
    let schema = projection(json!({ "first_name": { "type": "text" }, "age": { "type": "int" } }));
    let row = serdes
        .deserialize(&Value::from(json!({ "first_name": "A", "extra": 7 })), &schema)
        .unwrap();
    // `age` is absent and sparse; untyped `extra` follows the numeric policy
    assert_eq!(row, Value::from(json!({ "firstName": "A", "extra": "7" })));
}

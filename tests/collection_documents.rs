//! Collection profile end to end: host documents to wire JSON text and back.

use std::sync::Once;

use dataapi_serdes::{
    CamelSnakeCase, Codec, CollectionSerDes, ObjectId, PathSegment, Representation,
    RepresentationTable, SerDesError, Value, Verb,
};
use pretty_assertions::assert_eq;
use serde_json::json;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
struct Money {
    cents: i64,
    currency: String,
}

fn money_codec() -> Codec {
    Codec::for_host_type::<Money>()
        .named("money")
        .serialize(|_, value, _| {
            let money = value
                .downcast_ref::<Money>()
                .ok_or_else(|| anyhow::anyhow!("not money"))?;
            Ok(Verb::Done(Value::from(format!(
                "{} {}",
                money.cents, money.currency
            ))))
        })
}

fn money_reader() -> Codec {
    Codec::for_name("price")
        .named("price")
        .deserialize(|_, value, _| {
            let Some(text) = value.as_str() else {
                return Ok(Verb::Nevermind);
            };
            let (cents, currency) = text
                .split_once(' ')
                .ok_or_else(|| anyhow::anyhow!("bad price '{}'", text))?;
            Ok(Verb::Done(Value::custom(Money {
                cents: cents.parse()?,
                currency: currency.to_string(),
            })))
        })
}

fn through_text(serdes: &CollectionSerDes, host: &Value) -> Value {
    let wire = serdes.serialize(host).unwrap();
    let text = wire.to_json_string().unwrap();
    serdes
        .deserialize(&Value::from_json_str(&text).unwrap())
        .unwrap()
}

#[test]
fn plain_document_is_untouched() {
    init_tracing();
    let serdes = CollectionSerDes::new();
    let doc = Value::from(json!({ "name": "Alice", "position": 0 }));
    let out = serdes.serialize(&doc).unwrap();
    assert_eq!(out.value, doc);
    assert!(!out.used_custom_codec);
    assert_eq!(serdes.deserialize(&out.value).unwrap(), doc);
}

#[test]
fn domain_objects_round_trip_through_codecs() {
    init_tracing();
    let serdes = CollectionSerDes::builder()
        .codec(money_codec())
        .codec(money_reader())
        .build();
    let host: Value = [
        ("_id".to_string(), Value::from(ObjectId::new())),
        (
            "price".to_string(),
            Value::custom(Money {
                cents: 1999,
                currency: "EUR".into(),
            }),
        ),
        ("tags".to_string(), Value::from(vec![Value::from("a")])),
    ]
    .into_iter()
    .collect();

    let wire = serdes.serialize(&host).unwrap();
    assert!(wire.used_custom_codec);
    assert_eq!(wire.value.get("price"), Some(&Value::from("1999 EUR")));
    assert_eq!(through_text(&serdes, &host), host);
}

#[test]
fn key_transform_leaves_id_alone() {
    init_tracing();
    let serdes = CollectionSerDes::builder()
        .key_transformer(CamelSnakeCase::new())
        .build();
    let host = Value::from(json!({ "_id": "abc", "fullName": "Ada Lovelace" }));
    let wire = serdes.serialize(&host).unwrap();
    assert_eq!(
        wire.to_json_string().unwrap(),
        r#"{"_id":"abc","full_name":"Ada Lovelace"}"#
    );
    assert_eq!(serdes.deserialize(&wire.value).unwrap(), host);
}

#[test]
fn serialize_does_not_touch_the_input() {
    init_tracing();
    let serdes = CollectionSerDes::builder().codec(money_codec()).build();
    let host: Value = [(
        "price".to_string(),
        Value::custom(Money {
            cents: 5,
            currency: "USD".into(),
        }),
    )]
    .into_iter()
    .collect();
    let before = host.clone();
    serdes.serialize(&host).unwrap();
    assert_eq!(host, before);
}

#[test]
fn in_place_rewrites_the_callers_tree() {
    init_tracing();
    let serdes = CollectionSerDes::builder()
        .codec(
            Codec::for_path("items.*").serialize(|_, value, ctx| {
                assert!(ctx.mutate_in_place());
                Ok(Verb::Continue(Some(Value::from(
                    value.as_i64().unwrap_or(0) + 1,
                ))))
            }),
        )
        .build();
    let mut doc = Value::from(json!({ "items": [1, 2, 3] }));
    let items_ptr = doc.get("items").unwrap().as_array().unwrap().as_ptr();
    let report = serdes.serialize_in_place(&mut doc).unwrap();
    assert!(report.used_custom_codec);
    assert_eq!(doc, Value::from(json!({ "items": [2, 3, 4] })));
    assert_eq!(
        doc.get("items").unwrap().as_array().unwrap().as_ptr(),
        items_ptr
    );
}

#[test]
fn big_numbers_need_a_representation() {
    init_tracing();
    let text = r#"{"small":1,"huge":123456789012345678901234567890,"ratio":0.1000000000000000000001}"#;
    let wire = Value::from_json_str(text).unwrap();

    let lossy = CollectionSerDes::new().deserialize(&wire).unwrap();
    assert!(matches!(lossy.get("huge"), Some(Value::Number(_))));

    let exact = CollectionSerDes::builder()
        .numeric(
            RepresentationTable::new()
                .with("huge", Representation::BigInt)
                .with("ratio", Representation::String),
        )
        .build();
    let host = exact.deserialize(&wire).unwrap();
    assert!(matches!(host.get("huge"), Some(Value::BigInt(_))));
    assert_eq!(
        host.get("ratio"),
        Some(&Value::from("0.1000000000000000000001"))
    );

    let strict = CollectionSerDes::builder()
        .numeric(RepresentationTable::new().with("*", Representation::StrictNumber))
        .build();
    let err = strict.deserialize(&wire).unwrap_err();
    assert_eq!(err.code(), "PRECISION_LOSS");
    assert_eq!(err.path(), Some("huge"));
}

#[test]
fn out_of_range_exponents_stay_exact() {
    init_tracing();
    let text = r#"{"huge":1e100000000,"neg":-2.5e400}"#;
    let wire = Value::from_json_str(text).unwrap();

    let host = CollectionSerDes::new().deserialize(&wire).unwrap();
    assert_eq!(host, wire);
    let back = CollectionSerDes::new().serialize(&host).unwrap();
    assert_eq!(back.to_json_string().unwrap(), text);

    let bigint = CollectionSerDes::builder()
        .numeric(RepresentationTable::new().with("huge", Representation::BigInt))
        .build();
    let err = bigint.deserialize(&wire).unwrap_err();
    assert_eq!(err.code(), "PRECISION_LOSS");
    assert_eq!(err.path(), Some("huge"));
}

#[test]
fn inserted_ids_decode_like_id_fields() {
    init_tracing();
    let serdes = CollectionSerDes::new();
    let ids = serdes
        .deserialize_inserted_ids(&[
            Value::from(json!({ "$uuid": "6ba7b810-9dad-11d1-80b4-00c04fd430c8" })),
            Value::from(json!({ "$objectId": "507f1f77bcf86cd799439011" })),
            Value::from("custom-key"),
        ])
        .unwrap();
    assert!(matches!(ids[0], Value::Uuid(_)));
    assert!(matches!(ids[1], Value::ObjectId(_)));
    assert_eq!(ids[2], Value::from("custom-key"));
}

#[test]
fn codec_errors_surface_with_their_path() {
    init_tracing();
    let serdes = CollectionSerDes::builder().codec(money_reader()).build();
    let err = serdes
        .deserialize(&Value::from(json!({ "order": { "price": "oops" } })))
        .unwrap_err();
    match &err {
        SerDesError::Codec { path, source } => {
            assert_eq!(path, "order.price");
            assert!(source.to_string().contains("bad price"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn key_callback_sees_index_segments() {
    init_tracing();
    let serdes = CollectionSerDes::builder()
        .codec(Codec::for_path("list.1").serialize(|key, _, _| {
            assert_eq!(key, Some(&PathSegment::Index(1)));
            Ok(Verb::Done(Value::from("second")))
        }))
        .build();
    let out = serdes
        .serialize(&Value::from(json!({ "list": ["a", "b", "c"] })))
        .unwrap();
    assert_eq!(out.value, Value::from(json!({ "list": ["a", "second", "c"] })));
}

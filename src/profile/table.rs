use std::sync::Arc;
use tracing::warn;

use super::{ProfileOptions, SerializeReport, Serialized};
use crate::builtins;
use crate::codec::{Codec, Direction, Selector};
use crate::engine::{CallState, Engine, ProfileKind};
use crate::error::SerDesError;
use crate::keys::KeyTransformer;
use crate::numeric::NumericPolicy;
use crate::schema::TableSchema;
use crate::value::{Object, Value};

/// Table (typed row) profile.
///
/// Rows are decoded against the column types the service reports with each
/// result. Unless sparse data is enabled, every column in the schema is
/// present in the decoded row.
#[derive(Debug)]
pub struct TableSerDes {
    engine: Engine,
    sparse_data: bool,
}

impl TableSerDes {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TableSerDesBuilder {
        TableSerDesBuilder::default()
    }

    pub fn sparse_data(&self) -> bool {
        self.sparse_data
    }

    pub fn serialize(&self, value: &Value) -> Result<Serialized, SerDesError> {
        let mut out = value.clone();
        let report = self.engine.serialize(&mut out, false)?;
        Ok(Serialized::new(out, report))
    }

    pub fn serialize_in_place(&self, value: &mut Value) -> Result<SerializeReport, SerDesError> {
        self.engine.serialize(value, true)
    }

    pub fn deserialize(&self, wire: &Value, schema: &TableSchema) -> Result<Value, SerDesError> {
        let mut out = wire.clone();
        let call = CallState::new(Direction::Deserialize, false).with_schema(schema);
        self.engine.deserialize(&mut out, &call, Vec::new(), None)?;
        self.fill_absent(&mut out, schema);
        Ok(out)
    }

    pub fn deserialize_in_place(
        &self,
        wire: &mut Value,
        schema: &TableSchema,
    ) -> Result<(), SerDesError> {
        let call = CallState::new(Direction::Deserialize, true).with_schema(schema);
        self.engine.deserialize(wire, &call, Vec::new(), None)?;
        self.fill_absent(wire, schema);
        Ok(())
    }

    /// Decode one `insertedIds` entry: key values in `schema` order.
    pub fn deserialize_primary_key(
        &self,
        key: &[Value],
        schema: &TableSchema,
    ) -> Result<Value, SerDesError> {
        if key.len() != schema.len() {
            return Err(SerDesError::TypeMismatch {
                path: "(root)".to_string(),
                expected: format!("{} primary key values", schema.len()),
                found: format!("{} values", key.len()),
            });
        }
        let mut row = Value::Object(
            schema
                .columns()
                .zip(key)
                .map(|((name, _), value)| (name.to_string(), value.clone()))
                .collect::<Object>(),
        );
        let call = CallState::new(Direction::Deserialize, true)
            .with_schema(schema)
            .parsing_id();
        self.engine.deserialize(&mut row, &call, Vec::new(), None)?;
        Ok(row)
    }

    /// Add schema columns missing from a decoded row, in schema order.
    fn fill_absent(&self, row: &mut Value, schema: &TableSchema) {
        if self.sparse_data {
            return;
        }
        let keys = self
            .engine
            .keys
            .as_deref()
            .filter(|keys| keys.applies_at(&[]));
        let Some(fields) = row.as_object_mut() else {
            return;
        };
        for (name, ty) in schema.columns() {
            let host = match keys {
                Some(keys) => keys.to_host(name, &[]),
                None => name.to_string(),
            };
            if !fields.contains_key(&host) {
                fields.insert(host, ty.default_value());
            }
        }
    }
}

impl Default for TableSerDes {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableSerDesBuilder {
    options: ProfileOptions,
    sparse_data: bool,
}

impl TableSerDesBuilder {
    /// Register a user codec. Name-selected codecs are not offered by tables.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.options.codecs.push(codec);
        self
    }

    pub fn codecs(mut self, codecs: impl IntoIterator<Item = Codec>) -> Self {
        self.options.codecs.extend(codecs);
        self
    }

    pub fn numeric(mut self, policy: impl Into<NumericPolicy>) -> Self {
        self.options.numeric = policy.into();
        self
    }

    pub fn key_transformer(self, keys: impl KeyTransformer + 'static) -> Self {
        self.shared_key_transformer(Arc::new(keys))
    }

    pub fn shared_key_transformer(mut self, keys: Arc<dyn KeyTransformer>) -> Self {
        self.options.keys = Some(keys);
        self
    }

    pub fn vectors_as_binary(mut self, enabled: bool) -> Self {
        self.options.vectors_as_binary = enabled;
        self
    }

    /// Leave absent columns out of decoded rows instead of filling defaults.
    pub fn sparse_data(mut self, enabled: bool) -> Self {
        self.sparse_data = enabled;
        self
    }

    pub fn build(self) -> TableSerDes {
        for codec in &self.options.codecs {
            if let Selector::Name(name) = codec.selector() {
                warn!(
                    name = %name,
                    codec = codec.label(),
                    "name codecs are not used by tables; select by path or type instead"
                );
            }
        }
        TableSerDes {
            engine: self
                .options
                .into_engine(ProfileKind::Table, builtins::table::codecs()),
            sparse_data: self.sparse_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Verb;
    use crate::keys::CamelSnakeCase;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema(defs: &[(&str, &str)]) -> TableSchema {
        TableSchema::from_definitions(defs.iter().copied()).unwrap()
    }

    #[test]
    fn test_dense_rows_fill_defaults_in_schema_order() {
        let schema = schema(&[("a", "int"), ("b", "map<text, text>")]);
        let dense = TableSerDes::new()
            .deserialize(&Value::from(json!({})), &schema)
            .unwrap();
        assert_eq!(
            dense,
            Value::from_iter([
                ("a".to_string(), Value::Null),
                ("b".to_string(), Value::Map(vec![])),
            ])
        );

        let sparse = TableSerDes::builder()
            .sparse_data(true)
            .build()
            .deserialize(&Value::from(json!({})), &schema)
            .unwrap();
        assert_eq!(sparse, Value::from(json!({})));
    }

    #[test]
    fn test_mixed_row_keeps_wire_order_then_defaults() {
        let schema = schema(&[("text", "text"), ("int", "int"), ("ts", "timestamp")]);
        let row = TableSerDes::new()
            .deserialize(&Value::from(json!({ "text": "123", "int": 0 })), &schema)
            .unwrap();
        assert_eq!(row, Value::from(json!({ "text": "123", "int": 0, "ts": null })));
    }

    #[test]
    fn test_name_codecs_ignored() {
        let serdes = TableSerDes::builder()
            .codec(Codec::for_name("a").deserialize(|_, _, _| Ok(Verb::Done(Value::from("x")))))
            .build();
        let row = serdes
            .deserialize(&Value::from(json!({ "a": 1 })), &schema(&[("a", "int")]))
            .unwrap();
        assert_eq!(row, Value::from(json!({ "a": 1 })));
    }

    #[test]
    fn test_path_codec_beats_column_type() {
        let serdes = TableSerDes::builder()
            .codec(Codec::for_path("a").deserialize(|_, v, ctx| {
                assert_eq!(ctx.column_type().map(|t| t.type_name()), Some("int"));
                Ok(Verb::Done(Value::from(format!("#{}", v.as_i64().unwrap_or(0)))))
            }))
            .build();
        let row = serdes
            .deserialize(&Value::from(json!({ "a": 1 })), &schema(&[("a", "int")]))
            .unwrap();
        assert_eq!(row, Value::from(json!({ "a": "#1" })));
    }

    #[test]
    fn test_key_transformer_applies_to_defaults() {
        let serdes = TableSerDes::builder()
            .key_transformer(CamelSnakeCase::new())
            .build();
        let row = serdes
            .deserialize(
                &Value::from(json!({ "full_name": "A" })),
                &schema(&[("full_name", "text"), ("created_at", "timestamp")]),
            )
            .unwrap();
        assert_eq!(row, Value::from(json!({ "fullName": "A", "createdAt": null })));
    }

    #[test]
    fn test_primary_key() {
        let serdes = TableSerDes::new();
        let schema = schema(&[("id", "uuid"), ("n", "int")]);
        let key = serdes
            .deserialize_primary_key(
                &[
                    Value::from("6ba7b810-9dad-11d1-80b4-00c04fd430c8"),
                    Value::from(4),
                ],
                &schema,
            )
            .unwrap();
        assert!(matches!(key.get("id"), Some(Value::Uuid(_))));
        assert_eq!(key.get("n"), Some(&Value::from(4)));

        let err = serdes
            .deserialize_primary_key(&[Value::from(4)], &schema)
            .unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_parsing_id_visible_to_codecs() {
        let serdes = TableSerDes::builder()
            .codec(Codec::for_type("int").deserialize(|_, v, ctx| {
                if ctx.parsing_id() {
                    Ok(Verb::Done(Value::from(format!("id:{}", v.as_i64().unwrap_or(0)))))
                } else {
                    Ok(Verb::Nevermind)
                }
            }))
            .build();
        let schema = schema(&[("n", "int")]);
        let key = serdes
            .deserialize_primary_key(&[Value::from(4)], &schema)
            .unwrap();
        assert_eq!(key, Value::from(json!({ "n": "id:4" })));
        let row = serdes
            .deserialize(&Value::from(json!({ "n": 4 })), &schema)
            .unwrap();
        assert_eq!(row, Value::from(json!({ "n": 4 })));
    }
}

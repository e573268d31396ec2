use std::sync::Arc;

use super::{ProfileOptions, SerializeReport, Serialized};
use crate::builtins;
use crate::codec::{Codec, Direction};
use crate::engine::{CallState, Engine, ProfileKind};
use crate::error::SerDesError;
use crate::keys::KeyTransformer;
use crate::numeric::NumericPolicy;
use crate::value::{PathSegment, Value};

/// Document (JSON) collection profile.
///
/// ```
/// use dataapi_serdes::{CollectionSerDes, Value};
///
/// let serdes = CollectionSerDes::new();
/// let doc = Value::from_json_str(r#"{"name": "Alice", "position": 0}"#).unwrap();
/// let out = serdes.serialize(&doc).unwrap();
/// assert_eq!(out.value, doc);
/// assert!(!out.used_custom_codec);
/// ```
#[derive(Debug)]
pub struct CollectionSerDes {
    engine: Engine,
}

impl CollectionSerDes {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CollectionSerDesBuilder {
        CollectionSerDesBuilder::default()
    }

    /// Serialize a copy; `value` is left as it was.
    pub fn serialize(&self, value: &Value) -> Result<Serialized, SerDesError> {
        let mut out = value.clone();
        let report = self.engine.serialize(&mut out, false)?;
        Ok(Serialized::new(out, report))
    }

    /// Serialize by rewriting `value`, reusing its containers.
    ///
    /// On error `value` is partly converted but keeps all of its fields.
    pub fn serialize_in_place(&self, value: &mut Value) -> Result<SerializeReport, SerDesError> {
        self.engine.serialize(value, true)
    }

    pub fn deserialize(&self, wire: &Value) -> Result<Value, SerDesError> {
        let mut out = wire.clone();
        let call = CallState::new(Direction::Deserialize, false);
        self.engine.deserialize(&mut out, &call, Vec::new(), None)?;
        Ok(out)
    }

    pub fn deserialize_in_place(&self, wire: &mut Value) -> Result<(), SerDesError> {
        let call = CallState::new(Direction::Deserialize, true);
        self.engine.deserialize(wire, &call, Vec::new(), None)
    }

    /// Decode one `insertedIds` entry. Codecs see it at path `_id` with
    /// [`Context::parsing_id`](crate::Context::parsing_id) set.
    pub fn deserialize_inserted_id(&self, wire: &Value) -> Result<Value, SerDesError> {
        let mut out = wire.clone();
        let call = CallState::new(Direction::Deserialize, false).parsing_id();
        self.engine
            .deserialize(&mut out, &call, vec![PathSegment::from("_id")], None)?;
        Ok(out)
    }

    pub fn deserialize_inserted_ids(&self, wire: &[Value]) -> Result<Vec<Value>, SerDesError> {
        wire.iter()
            .map(|id| self.deserialize_inserted_id(id))
            .collect()
    }
}

impl Default for CollectionSerDes {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionSerDesBuilder {
    options: ProfileOptions,
}

impl CollectionSerDesBuilder {
    /// Register a user codec. Codecs are offered in registration order.
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

    /// Emit vectors as `{"$binary": ..}` (default) or as number arrays.
    pub fn vectors_as_binary(mut self, enabled: bool) -> Self {
        self.options.vectors_as_binary = enabled;
        self
    }

    pub fn build(self) -> CollectionSerDes {
        CollectionSerDes {
            engine: self
                .options
                .into_engine(ProfileKind::Collection, builtins::collection::codecs()),
        }
    }
}

//! Traversal engine.
//!
//! One depth-first walk serves both directions. At every node the engine asks
//! the registry for candidate codecs, offers the node to each in order, and
//! acts on the returned [`Verb`]. Nodes no codec finishes get the default
//! treatment: containers are walked (keys renamed by the key transformer),
//! numbers go through the numeric policy, and host-only values without a
//! codec are an error on serialize.
//!
//! The walk always works on a `&mut Value`. Whether the caller's tree is
//! reused or left untouched is decided by the entry point: the non-mutating
//! calls clone first.

mod context;

pub use context::Context;

pub(crate) use context::CallState;

use std::sync::Arc;
use tracing::{trace, warn};

use crate::codec::{CodecRegistry, Direction, PostMap, Verb};
use crate::error::SerDesError;
use crate::keys::KeyTransformer;
use crate::numeric::{self, NumericPolicy};
use crate::profile::SerializeReport;
use crate::schema::ColumnType;
use crate::value::{Number, Object, PathSegment, Value};

/// Restarts allowed at a single node before `Recurse` is treated as a loop.
pub const MAX_CODEC_RESTARTS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileKind {
    Collection,
    Table,
}

#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) kind: ProfileKind,
    pub(crate) registry: CodecRegistry,
    pub(crate) policy: NumericPolicy,
    pub(crate) keys: Option<Arc<dyn KeyTransformer>>,
    pub(crate) vectors_as_binary: bool,
}

impl Engine {
    pub(crate) fn new(
        kind: ProfileKind,
        registry: CodecRegistry,
        policy: NumericPolicy,
        keys: Option<Arc<dyn KeyTransformer>>,
        vectors_as_binary: bool,
    ) -> Self {
        Self {
            kind,
            registry,
            policy,
            keys,
            vectors_as_binary,
        }
    }

    pub(crate) fn serialize(
        &self,
        value: &mut Value,
        mutate_in_place: bool,
    ) -> Result<SerializeReport, SerDesError> {
        let call = CallState::new(Direction::Serialize, mutate_in_place);
        let ctx = Context::root(self, &call, Vec::new(), None);
        self.walk(value, &ctx)?;
        Ok(SerializeReport {
            used_custom_codec: call.used_custom_codec(),
            big_numbers: call.big_numbers(),
        })
    }

    pub(crate) fn deserialize(
        &self,
        value: &mut Value,
        call: &CallState<'_>,
        root: Vec<PathSegment>,
        column: Option<&ColumnType>,
    ) -> Result<(), SerDesError> {
        let ctx = Context::root(self, call, root, column);
        self.walk(value, &ctx)
    }

    /// Process one node and, unless a codec finished it, its children.
    pub(crate) fn walk(&self, value: &mut Value, ctx: &Context<'_>) -> Result<(), SerDesError> {
        let direction = ctx.direction();
        let mut post_maps: Vec<PostMap> = Vec::new();
        let mut restarts = 0;

        let finished = 'resolve: loop {
            let candidates = self.registry.resolve(
                direction,
                ctx.path(),
                self.resolution_type(value, ctx.column_type(), direction),
                value,
            );
            for codec in candidates {
                if !codec.accepts(value, ctx) {
                    continue;
                }
                let Some(handler) = codec.handler(direction) else {
                    continue;
                };
                let verb = handler(ctx.key(), value, ctx)
                    .map_err(|err| SerDesError::from_codec(ctx.display_path(), err))?;
                trace!(
                    path = %ctx.display_path(),
                    codec = codec.label(),
                    verb = verb.name(),
                    "codec answered"
                );
                if !matches!(verb, Verb::Nevermind) {
                    ctx.call.note_codec(codec);
                }
                match verb {
                    Verb::Done(out) => {
                        *value = out;
                        break 'resolve true;
                    }
                    Verb::Continue(Some(out)) => *value = out,
                    Verb::Continue(None) | Verb::Nevermind => {}
                    Verb::Recurse(out) => {
                        *value = out;
                        restarts += 1;
                        if restarts > MAX_CODEC_RESTARTS {
                            return Err(SerDesError::RecurseLimit {
                                path: ctx.display_path(),
                                limit: MAX_CODEC_RESTARTS,
                            });
                        }
                        continue 'resolve;
                    }
                    Verb::MapAfter(post) => post_maps.push(post),
                }
            }
            break false;
        };

        if !finished {
            match direction {
                Direction::Serialize => self.serialize_default(value, ctx)?,
                Direction::Deserialize => self.deserialize_default(value, ctx)?,
            }
        }

        for post in post_maps {
            let current = std::mem::take(value);
            *value = post(current, ctx)
                .map_err(|err| SerDesError::from_codec(ctx.display_path(), err))?;
        }
        Ok(())
    }

    /// Type name type-selected codecs are matched against.
    fn resolution_type<'v>(
        &self,
        value: &'v Value,
        column: Option<&'v ColumnType>,
        direction: Direction,
    ) -> Option<&'v str> {
        match (direction, self.kind) {
            (Direction::Serialize, _) => Some(value.type_name()),
            (Direction::Deserialize, ProfileKind::Collection) => value.marker_key(),
            (Direction::Deserialize, ProfileKind::Table) => column.map(ColumnType::type_name),
        }
    }

    fn serialize_default(&self, value: &mut Value, ctx: &Context<'_>) -> Result<(), SerDesError> {
        if value.is_numeric() {
            let encoded = numeric::encode(std::mem::take(value))?;
            if matches!(encoded, Value::Number(Number::Exact(_))) {
                ctx.call.note_big_number();
            }
            *value = encoded;
            return Ok(());
        }
        match value {
            Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
            Value::Array(items) => self.walk_items(items, ctx),
            Value::Object(fields) => self.walk_fields(fields, ctx),
            other => Err(SerDesError::Unserializable {
                path: ctx.display_path(),
                type_name: other.type_name().to_string(),
            }),
        }
    }

    fn deserialize_default(&self, value: &mut Value, ctx: &Context<'_>) -> Result<(), SerDesError> {
        if let Value::Number(number) = value {
            *value = numeric::decode(number, ctx.representation(), ctx.path())?;
            return Ok(());
        }
        let unknown_marker = self.kind == ProfileKind::Collection && value.marker_key().is_some();
        match value {
            Value::Object(_) if unknown_marker => {
                trace!(path = %ctx.display_path(), "unknown marker left as is");
                Ok(())
            }
            Value::Object(fields) => self.walk_fields(fields, ctx),
            Value::Array(items) => self.walk_items(items, ctx),
            _ => Ok(()),
        }
    }

    fn walk_items(&self, items: &mut [Value], ctx: &Context<'_>) -> Result<(), SerDesError> {
        for (idx, item) in items.iter_mut().enumerate() {
            self.walk(item, &ctx.child(PathSegment::Index(idx), None))?;
        }
        Ok(())
    }

    /// Walk object fields, renaming keys when the transformer covers this
    /// object. Renamed objects are rebuilt in the original order.
    ///
    /// On error every field is put back under its incoming name. Values
    /// already walked keep their converted form.
    fn walk_fields(&self, fields: &mut Object, ctx: &Context<'_>) -> Result<(), SerDesError> {
        let keys = self
            .keys
            .as_deref()
            .filter(|keys| keys.applies_at(ctx.path()));
        let Some(keys) = keys else {
            for (name, item) in fields.iter_mut() {
                let child = ctx.child(PathSegment::Field(name.clone()), self.column_for(ctx, name));
                self.walk(item, &child)?;
            }
            return Ok(());
        };

        let direction = ctx.direction();
        let mut pending = std::mem::take(fields).into_iter();
        let mut walked_fields: Vec<(String, String, Value)> = Vec::with_capacity(pending.len());
        while let Some((name, mut item)) = pending.next() {
            let (host, wire) = match direction {
                Direction::Serialize => {
                    let wire = keys.to_wire(&name, ctx.path());
                    (name, wire)
                }
                Direction::Deserialize => (keys.to_host(&name, ctx.path()), name),
            };
            let child = ctx.child(PathSegment::Field(host.clone()), self.column_for(ctx, &wire));
            let walked = self.walk(&mut item, &child);
            let (out, original) = match direction {
                Direction::Serialize => (wire, host),
                Direction::Deserialize => (host, wire),
            };
            if let Err(err) = walked {
                *fields = walked_fields
                    .into_iter()
                    .map(|(original, _, item)| (original, item))
                    .chain(std::iter::once((original, item)))
                    .chain(pending)
                    .collect();
                return Err(err);
            }
            walked_fields.push((original, out, item));
        }

        let mut renamed = Object::with_capacity(walked_fields.len());
        for (_, out, item) in walked_fields {
            if renamed.contains_key(&out) {
                warn!(
                    path = %ctx.display_path(),
                    key = %out,
                    "two keys renamed to the same name, keeping the later value"
                );
            }
            renamed.insert(out, item);
        }
        *fields = renamed;
        Ok(())
    }

    /// Declared type of a top-level column. Only root fields have one.
    fn column_for<'a>(&self, ctx: &Context<'a>, wire_name: &str) -> Option<&'a ColumnType> {
        if !ctx.path().is_empty() {
            return None;
        }
        ctx.call.schema.and_then(|schema| schema.column(wire_name))
    }
}

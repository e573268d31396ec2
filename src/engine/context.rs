//! Per-node view handed to codecs.

use std::cell::Cell;
use std::sync::Arc;

use super::{Engine, ProfileKind};
use crate::codec::{Codec, Direction};
use crate::error::SerDesError;
use crate::keys::KeyTransformer;
use crate::numeric::Representation;
use crate::schema::{ColumnType, TableSchema};
use crate::value::{display_path, PathSegment, Value};

/// State shared by every node of one top-level call.
pub(crate) struct CallState<'a> {
    pub(crate) direction: Direction,
    pub(crate) mutate_in_place: bool,
    pub(crate) parsing_id: bool,
    pub(crate) schema: Option<&'a TableSchema>,
    used_custom_codec: Cell<bool>,
    big_numbers: Cell<bool>,
}

impl<'a> CallState<'a> {
    pub(crate) fn new(direction: Direction, mutate_in_place: bool) -> Self {
        Self {
            direction,
            mutate_in_place,
            parsing_id: false,
            schema: None,
            used_custom_codec: Cell::new(false),
            big_numbers: Cell::new(false),
        }
    }

    pub(crate) fn parsing_id(mut self) -> Self {
        self.parsing_id = true;
        self
    }

    pub(crate) fn with_schema(mut self, schema: &'a TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub(crate) fn note_codec(&self, codec: &Codec) {
        if !codec.is_builtin() {
            self.used_custom_codec.set(true);
        }
    }

    pub(crate) fn note_big_number(&self) {
        self.big_numbers.set(true);
    }

    pub(crate) fn used_custom_codec(&self) -> bool {
        self.used_custom_codec.get()
    }

    pub(crate) fn big_numbers(&self) -> bool {
        self.big_numbers.get()
    }
}

/// Where the engine is and what it knows about the current node.
pub struct Context<'a> {
    pub(crate) engine: &'a Engine,
    pub(crate) call: &'a CallState<'a>,
    path: Vec<PathSegment>,
    column: Option<&'a ColumnType>,
}

impl<'a> Context<'a> {
    pub(crate) fn root(
        engine: &'a Engine,
        call: &'a CallState<'a>,
        path: Vec<PathSegment>,
        column: Option<&'a ColumnType>,
    ) -> Self {
        Self {
            engine,
            call,
            path,
            column,
        }
    }

    pub(crate) fn child(&self, segment: PathSegment, column: Option<&'a ColumnType>) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(segment);
        Self {
            engine: self.engine,
            call: self.call,
            path,
            column,
        }
    }

    /// Full path of the node, host names.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Key or index of the node within its parent; `None` at the root.
    pub fn key(&self) -> Option<&PathSegment> {
        self.path.last()
    }

    pub fn direction(&self) -> Direction {
        self.call.direction
    }

    pub fn profile(&self) -> ProfileKind {
        self.engine.kind
    }

    /// True while decoding an inserted id or primary key.
    pub fn parsing_id(&self) -> bool {
        self.call.parsing_id
    }

    /// True when the call was asked to reuse the caller's containers.
    pub fn mutate_in_place(&self) -> bool {
        self.call.mutate_in_place
    }

    /// Numeric representation configured for this path.
    pub fn representation(&self) -> Representation {
        self.engine.policy.representation_for(&self.path)
    }

    /// Declared column type, when deserializing a table row.
    pub fn column_type(&self) -> Option<&'a ColumnType> {
        self.column
    }

    pub fn key_transformer(&self) -> Option<&Arc<dyn KeyTransformer>> {
        self.engine.keys.as_ref()
    }

    /// Whether the active profile emits vectors as `{"$binary": ..}`.
    pub fn vectors_as_binary(&self) -> bool {
        self.engine.vectors_as_binary
    }

    pub fn display_path(&self) -> String {
        display_path(&self.path)
    }

    /// Run the engine on `value` as the child `segment` of this node and
    /// return the result. Used by container codecs to process elements.
    pub fn process_child(
        &self,
        segment: impl Into<PathSegment>,
        mut value: Value,
        column: Option<&'a ColumnType>,
    ) -> Result<Value, SerDesError> {
        let child = self.child(segment.into(), column);
        self.engine.walk(&mut value, &child)?;
        Ok(value)
    }

    pub(crate) fn type_mismatch(&self, expected: impl Into<String>, found: &Value) -> SerDesError {
        SerDesError::TypeMismatch {
            path: self.display_path(),
            expected: expected.into(),
            found: found.type_name().to_string(),
        }
    }
}

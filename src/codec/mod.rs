//! Codec contract.
//!
//! A codec pairs an optional serialize handler and an optional deserialize
//! handler with a [`Selector`] deciding which nodes it is offered. Handlers
//! receive `(key, value, ctx)` and answer with a [`Verb`].
//!
//! # Example
//!
//! ```
//! use dataapi_serdes::{Codec, Value, Verb};
//!
//! // Store prices as cents on the wire.
//! let cents = Codec::for_name("price")
//!     .serialize(|_key, value, _ctx| {
//!         Ok(match value.as_number() {
//!             Some(n) => Verb::Done(Value::from((n.as_f64() * 100.0).round() as i64)),
//!             None => Verb::Nevermind,
//!         })
//!     })
//!     .deserialize(|_key, value, _ctx| {
//!         Ok(match value.as_i64() {
//!             Some(c) => Verb::Done(Value::from(c as f64 / 100.0)),
//!             None => Verb::Nevermind,
//!         })
//!     });
//! # let _ = cents;
//! ```

pub mod registry;

pub use registry::CodecRegistry;

use std::fmt;
use std::sync::Arc;

use crate::engine::Context;
use crate::value::{HostObject, PathPattern, PathSegment, Value};

/// Which way the engine is walking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Serialize,
    Deserialize,
}

/// Post-order hook registered with [`Verb::MapAfter`].
pub type PostMap = Box<dyn FnOnce(Value, &Context<'_>) -> anyhow::Result<Value>>;

/// Codec answer for one node.
pub enum Verb {
    /// Final output for the node. No further codecs, no structural recursion.
    Done(Value),
    /// Optionally replace the node value, then offer it to the next candidate.
    Continue(Option<Value>),
    /// Replace the node value and restart resolution at the same path.
    Recurse(Value),
    /// Not applicable; as if the codec had not run.
    Nevermind,
    /// Run the function on the finished node value, then try the next
    /// candidate.
    MapAfter(PostMap),
}

impl Verb {
    pub fn map_after<F>(f: F) -> Self
    where
        F: FnOnce(Value, &Context<'_>) -> anyhow::Result<Value> + 'static,
    {
        Self::MapAfter(Box::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Done(_) => "done",
            Self::Continue(_) => "continue",
            Self::Recurse(_) => "recurse",
            Self::Nevermind => "nevermind",
            Self::MapAfter(_) => "map_after",
        }
    }
}

impl fmt::Debug for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(v) => f.debug_tuple("Done").field(v).finish(),
            Self::Continue(v) => f.debug_tuple("Continue").field(v).finish(),
            Self::Recurse(v) => f.debug_tuple("Recurse").field(v).finish(),
            Self::Nevermind => f.write_str("Nevermind"),
            Self::MapAfter(_) => f.write_str("MapAfter(..)"),
        }
    }
}

pub type Handler =
    dyn Fn(Option<&PathSegment>, &Value, &Context<'_>) -> anyhow::Result<Verb> + Send + Sync;
pub type Guard = dyn Fn(&Value, &Context<'_>) -> bool + Send + Sync;
pub type ClassPredicate = dyn Fn(&Value) -> bool + Send + Sync;

/// Which nodes a codec is offered. Precedence: `Path` > `Name` > `Type`/`Class`.
#[derive(Clone)]
pub enum Selector {
    /// Whole-path match, `*` matching any one segment.
    Path(PathPattern),
    /// Object key, wherever it occurs.
    Name(String),
    /// Type name of the node (host type, wire marker, or declared column type).
    Type(String),
    /// Predicate over the node value.
    Class(Arc<ClassPredicate>),
}

impl Selector {
    pub fn tier(&self) -> u8 {
        match self {
            Self::Path(_) => 0,
            Self::Name(_) => 1,
            Self::Type(_) | Self::Class(_) => 2,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "Path({})", p),
            Self::Name(n) => write!(f, "Name({})", n),
            Self::Type(t) => write!(f, "Type({})", t),
            Self::Class(_) => f.write_str("Class(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Codec {
    selector: Selector,
    serialize: Option<Arc<Handler>>,
    deserialize: Option<Arc<Handler>>,
    guard: Option<Arc<Guard>>,
    label: Option<String>,
    builtin: bool,
}

impl Codec {
    fn with_selector(selector: Selector) -> Self {
        Self {
            selector,
            serialize: None,
            deserialize: None,
            guard: None,
            label: None,
            builtin: false,
        }
    }

    /// Offer the codec the node at exactly `pattern` (`"a.b.0"`, `"items.*"`).
    pub fn for_path(pattern: impl Into<PathPattern>) -> Self {
        Self::with_selector(Selector::Path(pattern.into()))
    }

    /// Offer the codec every field called `name`. Collections only.
    pub fn for_name(name: impl Into<String>) -> Self {
        Self::with_selector(Selector::Name(name.into()))
    }

    /// Offer the codec nodes whose type name is `type_name`.
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self::with_selector(Selector::Type(type_name.into()))
    }

    /// Offer the codec nodes the predicate accepts.
    pub fn for_class<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::with_selector(Selector::Class(Arc::new(predicate)))
    }

    /// Offer the codec domain objects of type `T`.
    pub fn for_host_type<T: HostObject>() -> Self {
        Self::for_class(|value| value.downcast_ref::<T>().is_some())
    }

    pub fn serialize<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&PathSegment>, &Value, &Context<'_>) -> anyhow::Result<Verb>
            + Send
            + Sync
            + 'static,
    {
        self.serialize = Some(Arc::new(handler));
        self
    }

    pub fn deserialize<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&PathSegment>, &Value, &Context<'_>) -> anyhow::Result<Verb>
            + Send
            + Sync
            + 'static,
    {
        self.deserialize = Some(Arc::new(handler));
        self
    }

    /// Applicability check run before either handler; rejecting is the same
    /// as answering [`Verb::Nevermind`].
    pub fn when<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Value, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Name shown in trace logs.
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn into_builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("anonymous")
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub(crate) fn handler(&self, direction: Direction) -> Option<&Handler> {
        match direction {
            Direction::Serialize => self.serialize.as_deref(),
            Direction::Deserialize => self.deserialize.as_deref(),
        }
    }

    pub(crate) fn accepts(&self, value: &Value, ctx: &Context<'_>) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(value, ctx))
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("selector", &self.selector)
            .field("label", &self.label())
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .field("builtin", &self.builtin)
            .finish()
    }
}

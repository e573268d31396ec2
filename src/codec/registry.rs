//! Tiered codec lookup.
//!
//! Candidates for a node come back in offer order:
//!
//! 1. path codecs whose pattern matches the full node path
//! 2. name codecs for the node's key (when the name tier is enabled)
//! 3. type and class codecs, merged in registration order
//!
//! Within each tier user codecs precede built-ins, and registration order is
//! kept. Only codecs with a handler for the requested direction are returned.

use tracing::trace;

use super::{Codec, Direction, Selector};
use crate::value::{display_path, PathSegment, Value};

#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: Vec<Codec>,
    name_tier: bool,
}

impl CodecRegistry {
    /// Registry with user codecs offered ahead of `builtins`.
    pub fn new(user: Vec<Codec>, builtins: Vec<Codec>) -> Self {
        let mut codecs = user;
        codecs.extend(builtins.into_iter().map(Codec::into_builtin));
        Self {
            codecs,
            name_tier: true,
        }
    }

    /// Drop the name tier. Name codecs stay registered but are never offered.
    pub fn without_name_tier(mut self) -> Self {
        self.name_tier = false;
        self
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn codecs(&self) -> &[Codec] {
        &self.codecs
    }

    /// Codecs to offer the node at `path`, in order.
    ///
    /// `type_name` is the host type name on serialize and the marker key or
    /// declared column type on deserialize.
    pub fn resolve(
        &self,
        direction: Direction,
        path: &[PathSegment],
        type_name: Option<&str>,
        value: &Value,
    ) -> Vec<&Codec> {
        let key = path.last().and_then(PathSegment::as_field);
        let usable = || {
            self.codecs
                .iter()
                .filter(move |codec| codec.handler(direction).is_some())
        };

        let by_path = usable().filter(|codec| {
            matches!(codec.selector(), Selector::Path(pattern) if pattern.matches(path))
        });
        let by_name = usable().filter(|codec| {
            self.name_tier
                && matches!(codec.selector(), Selector::Name(name) if Some(name.as_str()) == key)
        });
        let by_type = usable().filter(|codec| match codec.selector() {
            Selector::Type(name) => Some(name.as_str()) == type_name,
            Selector::Class(predicate) => predicate(value),
            _ => false,
        });

        let candidates: Vec<&Codec> = by_path.chain(by_name).chain(by_type).collect();
        if !candidates.is_empty() {
            trace!(
                path = %display_path(path),
                ?direction,
                type_name,
                count = candidates.len(),
                "resolved codecs"
            );
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Verb;

    fn path(dotted: &str) -> Vec<PathSegment> {
        dotted
            .split('.')
            .map(|s| match s.parse::<usize>() {
                Ok(idx) => PathSegment::Index(idx),
                Err(_) => PathSegment::Field(s.to_string()),
            })
            .collect()
    }

    fn both(codec: Codec) -> Codec {
        codec
            .serialize(|_, _, _| Ok(Verb::Nevermind))
            .deserialize(|_, _, _| Ok(Verb::Nevermind))
    }

    fn labels(found: Vec<&Codec>) -> Vec<&str> {
        found.into_iter().map(Codec::label).collect()
    }

    #[test]
    fn test_tiers_in_precedence_order() {
        let registry = CodecRegistry::new(
            vec![
                both(Codec::for_type("string")).named("type"),
                both(Codec::for_name("email")).named("name"),
                both(Codec::for_path("user.email")).named("path"),
            ],
            vec![],
        );
        let found = registry.resolve(
            Direction::Serialize,
            &path("user.email"),
            Some("string"),
            &Value::from("a@b.c"),
        );
        assert_eq!(labels(found), vec!["path", "name", "type"]);
    }

    #[test]
    fn test_user_codecs_before_builtins_in_tier() {
        let registry = CodecRegistry::new(
            vec![both(Codec::for_type("uuid")).named("user")],
            vec![both(Codec::for_type("uuid")).named("builtin")],
        );
        let found = registry.resolve(
            Direction::Serialize,
            &path("id"),
            Some("uuid"),
            &Value::Null,
        );
        assert_eq!(labels(found), vec!["user", "builtin"]);
        assert!(registry.codecs()[1].is_builtin());
    }

    #[test]
    fn test_type_and_class_share_a_tier_in_registration_order() {
        let registry = CodecRegistry::new(
            vec![
                both(Codec::for_class(|v| v.as_str().is_some())).named("class"),
                both(Codec::for_type("string")).named("type"),
            ],
            vec![],
        );
        let found = registry.resolve(
            Direction::Deserialize,
            &path("x"),
            Some("string"),
            &Value::from("x"),
        );
        assert_eq!(labels(found), vec!["class", "type"]);
    }

    #[test]
    fn test_direction_filters_handlers() {
        let registry = CodecRegistry::new(
            vec![Codec::for_name("a")
                .serialize(|_, _, _| Ok(Verb::Nevermind))
                .named("ser-only")],
            vec![],
        );
        assert_eq!(
            registry
                .resolve(Direction::Serialize, &path("a"), None, &Value::Null)
                .len(),
            1
        );
        assert!(registry
            .resolve(Direction::Deserialize, &path("a"), None, &Value::Null)
            .is_empty());
    }

    #[test]
    fn test_name_tier_can_be_disabled() {
        let registry =
            CodecRegistry::new(vec![both(Codec::for_name("a"))], vec![]).without_name_tier();
        assert!(registry
            .resolve(Direction::Serialize, &path("a"), None, &Value::Null)
            .is_empty());
    }

    #[test]
    fn test_path_wildcards_and_indices() {
        let registry = CodecRegistry::new(
            vec![both(Codec::for_path("items.*.price")).named("price")],
            vec![],
        );
        let found = registry.resolve(
            Direction::Serialize,
            &path("items.3.price"),
            None,
            &Value::Null,
        );
        assert_eq!(labels(found), vec!["price"]);
        assert!(registry
            .resolve(Direction::Serialize, &path("items.price"), None, &Value::Null)
            .is_empty());
    }
}

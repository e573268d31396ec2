//! Key transformers.
//!
//! A transformer renames object keys at the wire boundary. Values are never
//! touched. The engine asks [`KeyTransformer::applies_at`] for each object it
//! enters, passing the object's own path; the default covers the root object
//! only.
//!
//! Path-based codec and numeric lookups always see host names: on serialize
//! the child path is built before renaming, on deserialize after.

use arc_swap::ArcSwap;
use heck::{ToLowerCamelCase, ToSnakeCase};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::PathSegment;

pub trait KeyTransformer: Send + Sync + fmt::Debug {
    /// Host name to wire name. `path` is the path of the enclosing object.
    fn to_wire(&self, name: &str, path: &[PathSegment]) -> String;

    /// Wire name to host name. `path` is the path of the enclosing object.
    fn to_host(&self, name: &str, path: &[PathSegment]) -> String;

    /// Whether keys of the object at `path` are renamed.
    fn applies_at(&self, path: &[PathSegment]) -> bool {
        path.is_empty()
    }
}

/// Upper bound on memoised names per direction.
const MAX_MEMO_ENTRIES: usize = 4096;

/// Append-only name cache. Reads never lock; inserts copy the table.
#[derive(Default)]
struct CaseMemo {
    names: ArcSwap<HashMap<String, String>>,
}

impl CaseMemo {
    fn get_or_convert(&self, name: &str, convert: impl FnOnce(&str) -> String) -> String {
        if let Some(hit) = self.names.load().get(name) {
            return hit.clone();
        }
        let converted = convert(name);
        if self.names.load().len() < MAX_MEMO_ENTRIES {
            self.names.rcu(|current| {
                let mut next = HashMap::clone(current);
                next.entry(name.to_string())
                    .or_insert_with(|| converted.clone());
                next
            });
        }
        converted
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.names.load().len()
    }
}

type NestedFn = dyn Fn(&[PathSegment]) -> bool + Send + Sync;

/// camelCase on the host, snake_case on the wire.
///
/// `$`-prefixed keys are never renamed. `_id` is left alone unless
/// [`CamelSnakeCase::transform_id`] is set.
pub struct CamelSnakeCase {
    exempt_id: bool,
    nested: Option<Arc<NestedFn>>,
    to_snake: CaseMemo,
    to_camel: CaseMemo,
}

impl CamelSnakeCase {
    pub fn new() -> Self {
        Self {
            exempt_id: true,
            nested: None,
            to_snake: CaseMemo::default(),
            to_camel: CaseMemo::default(),
        }
    }

    /// Rename `_id` like any other key.
    pub fn transform_id(mut self) -> Self {
        self.exempt_id = false;
        self
    }

    /// Decide per nested object (by its path) whether its keys are renamed.
    /// The root object is always renamed.
    pub fn with_nested<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[PathSegment]) -> bool + Send + Sync + 'static,
    {
        self.nested = Some(Arc::new(predicate));
        self
    }

    /// Rename keys at every depth.
    pub fn deep(self) -> Self {
        self.with_nested(|_| true)
    }

    fn is_exempt(&self, name: &str) -> bool {
        name.starts_with('$') || (self.exempt_id && name == "_id")
    }

    #[cfg(test)]
    pub(crate) fn memo_len(&self) -> (usize, usize) {
        (self.to_snake.len(), self.to_camel.len())
    }
}

impl Default for CamelSnakeCase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CamelSnakeCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CamelSnakeCase")
            .field("exempt_id", &self.exempt_id)
            .field("nested", &self.nested.is_some())
            .finish()
    }
}

impl KeyTransformer for CamelSnakeCase {
    fn to_wire(&self, name: &str, _path: &[PathSegment]) -> String {
        if self.is_exempt(name) {
            return name.to_string();
        }
        self.to_snake.get_or_convert(name, |n| n.to_snake_case())
    }

    fn to_host(&self, name: &str, _path: &[PathSegment]) -> String {
        if self.is_exempt(name) {
            return name.to_string();
        }
        self.to_camel.get_or_convert(name, |n| n.to_lower_camel_case())
    }

    fn applies_at(&self, path: &[PathSegment]) -> bool {
        path.is_empty() || self.nested.as_ref().is_some_and(|nested| nested(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_camel_to_snake_and_back() {
        let keys = CamelSnakeCase::new();
        assert_eq!(keys.to_wire("fullName", &[]), "full_name");
        assert_eq!(keys.to_host("full_name", &[]), "fullName");
        assert_eq!(keys.to_wire("name", &[]), "name");
    }

    #[test]
    fn test_id_and_dollar_keys_exempt() {
        let keys = CamelSnakeCase::new();
        assert_eq!(keys.to_wire("_id", &[]), "_id");
        assert_eq!(keys.to_host("_id", &[]), "_id");
        assert_eq!(keys.to_wire("$vector", &[]), "$vector");
    }

    #[test]
    fn test_id_transformed_when_not_exempt() {
        let keys = CamelSnakeCase::new().transform_id();
        assert_eq!(keys.to_wire("_id", &[]), "id");
    }

    #[test]
    fn test_nested_predicate() {
        let root_only = CamelSnakeCase::new();
        let nested_path = vec![PathSegment::Field("address".into())];
        assert!(root_only.applies_at(&[]));
        assert!(!root_only.applies_at(&nested_path));

        let deep = CamelSnakeCase::new().deep();
        assert!(deep.applies_at(&nested_path));

        let only_address = CamelSnakeCase::new().with_nested(|path| {
            path.first().and_then(PathSegment::as_field) == Some("address")
        });
        assert!(only_address.applies_at(&nested_path));
        assert!(!only_address.applies_at(&[PathSegment::Field("other".into())]));
    }

    #[test]
    fn test_memo_is_populated_once() {
        let keys = CamelSnakeCase::new();
        for _ in 0..3 {
            keys.to_wire("createdAt", &[]);
        }
        assert_eq!(keys.memo_len(), (1, 0));
    }

    #[test]
    fn test_concurrent_conversions_agree() {
        let keys = Arc::new(CamelSnakeCase::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let keys = Arc::clone(&keys);
                thread::spawn(move || {
                    (0..200)
                        .map(|i| keys.to_wire(&format!("field{}Name{}", i % 50, t % 2), &[]))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(name.starts_with("field"));
                assert!(name.contains("_name"));
            }
        }
        assert_eq!(keys.memo_len().0, 100);
    }
}

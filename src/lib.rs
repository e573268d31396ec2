//! Codec-driven serialization for Data API documents and table rows.
//!
//! Values cross the wire boundary through a profile:
//!
//! - [`CollectionSerDes`] for schemaless JSON documents. Extended types use
//!   `$`-marker objects (`{"$date": ..}`, `{"$uuid": ..}`, `{"$binary": ..}`).
//! - [`TableSerDes`] for typed rows. Results are decoded against the column
//!   types the service reports, and absent columns are filled in unless
//!   sparse data is on.
//!
//! Both run the same engine: a depth-first walk that offers each node to user
//! and built-in [`Codec`]s, selected by path, field name, or type, before
//! falling back to structural recursion and the [`NumericPolicy`].
//!
//! ```
//! use dataapi_serdes::{CamelSnakeCase, CollectionSerDes, Value};
//!
//! let serdes = CollectionSerDes::builder()
//!     .key_transformer(CamelSnakeCase::new())
//!     .build();
//!
//! let doc = Value::from_json_str(r#"{"_id": 1, "fullName": "Ada"}"#).unwrap();
//! let wire = serdes.serialize(&doc).unwrap();
//! assert_eq!(wire.to_json_string().unwrap(), r#"{"_id":1,"full_name":"Ada"}"#);
//! assert_eq!(serdes.deserialize(&wire.value).unwrap(), doc);
//! ```

pub mod codec;
pub mod config;
pub mod datatypes;
pub mod engine;
pub mod error;
pub mod keys;
pub mod numeric;
pub mod profile;
pub mod schema;
pub mod value;

mod builtins;

pub use codec::{Codec, Direction, Selector, Verb};
pub use config::{KeyCase, SerDesConfig};
pub use datatypes::{DataApiVector, ObjectId};
pub use engine::{Context, ProfileKind};
pub use error::SerDesError;
pub use keys::{CamelSnakeCase, KeyTransformer};
pub use numeric::{NumericPolicy, Representation, RepresentationTable};
pub use profile::{
    CollectionSerDes, CollectionSerDesBuilder, SerializeReport, Serialized, TableSerDes,
    TableSerDesBuilder,
};
pub use schema::{ColumnType, TableSchema};
pub use value::{HostObject, Number, Object, PathPattern, PathSegment, Value};

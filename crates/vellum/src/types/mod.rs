//! The typed value model: values, documents, arrays, paths, and the
//! order-preserving byte encoding used for index keys and record ids.

mod document;
mod encoding;
mod path;
mod value;

pub use document::{Array, Document, FieldBuffer};
pub use encoding::{decode_value, decode_value_prefix, encode_value, encode_value_into};
pub use path::{Path, PathComponent};
pub use value::{Value, ValueKind};

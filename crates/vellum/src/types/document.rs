//! Documents and arrays.
//!
//! A document is an ordered sequence of uniquely-named fields. The query
//! layer only ever reads documents; mutation goes through `FieldBuffer`,
//! which is also how schema-evolution passes rewrite stored records.

use serde::{Deserialize, Serialize};

use super::Value;
use crate::error::{Error, Result};

/// An ordered sequence of `(name, Value)` fields with unique names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    /// Field lookup by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Replaces the field if present, appends it otherwise. Mutation is
    /// reserved to the storage layer; the query layer sees documents as
    /// immutable.
    pub(crate) fn set(&mut self, name: &str, value: Value) {
        match self.get_mut(name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An indexed sequence of values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Array {
    items: Vec<Value>,
}

impl Array {
    pub fn new() -> Array {
        Array::default()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Array {
        Array { items }
    }
}

/// Mutable builder over a document's fields. Used to assemble documents
/// field by field and by the schema-evolution passes, which decode a stored
/// record into a buffer, rewrite it, and re-encode.
#[derive(Debug, Clone, Default)]
pub struct FieldBuffer {
    fields: Vec<(String, Value)>,
}

impl FieldBuffer {
    pub fn new() -> FieldBuffer {
        FieldBuffer::default()
    }

    pub fn from_document(doc: &Document) -> FieldBuffer {
        FieldBuffer {
            fields: doc.fields.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Appends a field. The name must not be present yet.
    pub fn add(&mut self, name: &str, value: Value) -> Result<()> {
        if self.get(name).is_some() {
            return Err(Error::AlreadyExists(format!("field {}", name)));
        }
        self.fields.push((name.to_owned(), value));
        Ok(())
    }

    /// Replaces an existing field in place, keeping its position.
    pub fn replace(&mut self, name: &str, value: Value) -> Result<()> {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::NotFound(format!("field {}", name))),
        }
    }

    /// Replaces the field if present, appends it otherwise.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    /// Removes a field by name.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        match self.fields.iter().position(|(field, _)| field == name) {
            Some(i) => {
                self.fields.remove(i);
                Ok(())
            }
            None => Err(Error::NotFound(format!("field {}", name))),
        }
    }

    /// Renames a field, keeping its position and value. The new name must
    /// not be present yet.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if self.get(new).is_some() {
            return Err(Error::AlreadyExists(format!("field {}", new)));
        }
        match self.fields.iter_mut().find(|(field, _)| field == old) {
            Some((name, _)) => {
                *name = new.to_owned();
                Ok(())
            }
            None => Err(Error::NotFound(format!("field {}", old))),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_document(self) -> Document {
        Document {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_builds_documents_in_order() {
        let mut buf = FieldBuffer::new();
        buf.add("a", Value::Int64(1)).unwrap();
        buf.add("b", Value::Text("x".into())).unwrap();
        assert!(buf.add("a", Value::Int64(2)).is_err());

        let doc = buf.into_document();
        let names: Vec<_> = doc.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(doc.get("b"), Some(&Value::Text("x".into())));
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn buffer_mutations() {
        let mut buf = FieldBuffer::new();
        buf.add("a", Value::Int64(1)).unwrap();
        buf.add("b", Value::Int64(2)).unwrap();

        buf.replace("a", Value::Int64(10)).unwrap();
        assert!(buf.replace("missing", Value::Null).is_err());

        buf.rename("b", "c").unwrap();
        assert!(buf.rename("missing", "d").is_err());
        assert!(buf.rename("a", "c").is_err());

        buf.delete("a").unwrap();
        assert!(buf.delete("a").is_err());

        let doc = buf.into_document();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("c"), Some(&Value::Int64(2)));
    }
}

//! Path expressions: field-name and array-index components identifying a
//! location inside a document.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Document, Value};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathComponent {
    Field(String),
    Index(usize),
}

/// A non-empty component list, e.g. `a.b[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<PathComponent>);

impl Path {
    pub fn new(components: Vec<PathComponent>) -> Path {
        debug_assert!(!components.is_empty());
        Path(components)
    }

    /// A single-field path.
    pub fn field(name: impl Into<String>) -> Path {
        Path(vec![PathComponent::Field(name.into())])
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    /// The field name of a single-field path, if that is what this is.
    pub fn as_field_name(&self) -> Option<&str> {
        match &self.0[..] {
            [PathComponent::Field(name)] => Some(name),
            _ => None,
        }
    }

    /// Walks the path through documents and arrays. Any miss, including a
    /// component kind that does not match the value it lands on, yields
    /// `None` rather than an error so predicates see null for missing
    /// fields.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for component in &self.0 {
            current = match (component, current) {
                (PathComponent::Field(name), Value::Document(doc)) => doc.get(name)?,
                (PathComponent::Index(i), Value::Array(array)) => array.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Like `resolve`, starting from a document rather than a wrapped value.
    pub fn resolve_document<'a>(&self, doc: &'a Document) -> Option<&'a Value> {
        let (head, rest) = self.0.split_first().expect("paths are non-empty");
        let mut current = match head {
            PathComponent::Field(name) => doc.get(name)?,
            PathComponent::Index(_) => return None,
        };
        for component in rest {
            current = match (component, current) {
                (PathComponent::Field(name), Value::Document(doc)) => doc.get(name)?,
                (PathComponent::Index(i), Value::Array(array)) => array.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `new_value` at this path inside `doc`, creating missing
    /// intermediate documents along field components. Indexing past the end
    /// of an array or through a value of the wrong kind is an error.
    pub fn set_in_document(&self, doc: &mut Document, new_value: Value) -> Result<()> {
        let (head, rest) = self.0.split_first().expect("paths are non-empty");
        let name = match head {
            PathComponent::Field(name) => name,
            PathComponent::Index(_) => {
                return Err(Error::type_mismatch("document field", "array index"))
            }
        };
        if rest.is_empty() {
            doc.set(name, new_value);
            return Ok(());
        }
        match doc.get_mut(name) {
            Some(child) => set_recursive(rest, child, new_value),
            None => {
                let mut child = Value::Document(Document::new());
                set_recursive(rest, &mut child, new_value)?;
                doc.set(name, child);
                Ok(())
            }
        }
    }
}

fn set_recursive(components: &[PathComponent], current: &mut Value, new_value: Value) -> Result<()> {
    let (head, rest) = components.split_first().expect("checked by callers");
    match (head, current) {
        (PathComponent::Field(name), Value::Document(doc)) => {
            if rest.is_empty() {
                doc.set(name, new_value);
                return Ok(());
            }
            match doc.get_mut(name) {
                Some(child) => set_recursive(rest, child, new_value),
                None => {
                    let mut child = Value::Document(Document::new());
                    set_recursive(rest, &mut child, new_value)?;
                    doc.set(name, child);
                    Ok(())
                }
            }
        }
        (PathComponent::Index(i), Value::Array(array)) => match array.get_mut(*i) {
            Some(child) => {
                if rest.is_empty() {
                    *child = new_value;
                    Ok(())
                } else {
                    set_recursive(rest, child, new_value)
                }
            }
            None => Err(Error::NotFound(format!("array index {}", i))),
        },
        (PathComponent::Field(_), other) => {
            Err(Error::type_mismatch("document", other.kind().to_string()))
        }
        (PathComponent::Index(_), other) => {
            Err(Error::type_mismatch("array", other.kind().to_string()))
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            match component {
                PathComponent::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathComponent::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Array, FieldBuffer};

    fn sample() -> Value {
        let mut inner = FieldBuffer::new();
        inner
            .add(
                "scores",
                Value::Array(Array::from(vec![Value::Int64(10), Value::Int64(20)])),
            )
            .unwrap();

        let mut doc = FieldBuffer::new();
        doc.add("name", Value::Text("ada".into())).unwrap();
        doc.add("stats", Value::Document(inner.into_document()))
            .unwrap();
        Value::Document(doc.into_document())
    }

    #[test]
    fn resolves_nested_paths() {
        let value = sample();
        let path = Path::new(vec![
            PathComponent::Field("stats".into()),
            PathComponent::Field("scores".into()),
            PathComponent::Index(1),
        ]);
        assert_eq!(path.resolve(&value), Some(&Value::Int64(20)));
        assert_eq!(path.to_string(), "stats.scores[1]");
    }

    #[test]
    fn missing_components_yield_none() {
        let value = sample();
        assert_eq!(Path::field("missing").resolve(&value), None);

        let bad_kind = Path::new(vec![
            PathComponent::Field("name".into()),
            PathComponent::Index(0),
        ]);
        assert_eq!(bad_kind.resolve(&value), None);

        let out_of_range = Path::new(vec![
            PathComponent::Field("stats".into()),
            PathComponent::Field("scores".into()),
            PathComponent::Index(9),
        ]);
        assert_eq!(out_of_range.resolve(&value), None);
    }

    #[test]
    fn set_creates_missing_documents() {
        let mut doc = Document::new();
        let path = Path::new(vec![
            PathComponent::Field("a".into()),
            PathComponent::Field("b".into()),
        ]);
        path.set_in_document(&mut doc, Value::Int64(7)).unwrap();
        assert_eq!(
            path.resolve_document(&doc),
            Some(&Value::Int64(7)),
            "{:?}",
            doc
        );

        Path::field("a")
            .set_in_document(&mut doc, Value::Int64(1))
            .unwrap();
        assert_eq!(doc.get("a"), Some(&Value::Int64(1)));
        assert!(path.set_in_document(&mut doc, Value::Null).is_err());
    }
}

//! Tables: a record store keyed by record id, with synchronous maintenance
//! of the table's secondary indexes and schema-evolution passes over stored
//! records.

use tracing::debug;
use vellum_engine::{IterControl, Store, StoreError, Transaction};

use super::{new_record_id, scan, Catalog, Index, IndexConfig, TableConfig};
use crate::error::{Error, Result};
use crate::record;
use crate::types::{encode_value, Document, FieldBuffer, Value};

/// A handle on one table, bound to a transaction.
pub struct Table<'a> {
    name: String,
    config: TableConfig,
    store: Box<dyn Store + 'a>,
    indexes: Vec<(String, Index<'a>)>,
}

impl<'a> Table<'a> {
    pub fn open(tx: &'a dyn Transaction, name: &str) -> Result<Table<'a>> {
        let config = Catalog::table_config(tx, name)?;
        let store = match tx.get_store(name.as_bytes()) {
            Ok(store) => store,
            Err(StoreError::StoreNotFound(_)) => {
                return Err(Error::NotFound(format!("table {}", name)))
            }
            Err(err) => return Err(err.into()),
        };
        let mut indexes = Vec::new();
        for (index_name, index_config) in Catalog::table_indexes(tx, name)? {
            let index = Index::from_config(tx, index_config)?;
            indexes.push((index_name, index));
        }
        Ok(Table {
            name: name.to_owned(),
            config,
            store,
            indexes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The indexes declared on this table, for the planner.
    pub fn indexes(&self) -> impl Iterator<Item = (&str, &IndexConfig)> {
        self.indexes
            .iter()
            .map(|(name, index)| (name.as_str(), index.config()))
    }

    /// Inserts a document and returns its record id.
    pub fn insert(&mut self, doc: Document) -> Result<Vec<u8>> {
        let doc = self.apply_constraints(doc)?;
        let id = self.record_id_for(&doc)?;
        match self.store.get(&id) {
            Ok(_) => {
                return Err(Error::Duplicate(format!(
                    "record id already exists in table {}",
                    self.name
                )))
            }
            Err(StoreError::KeyNotFound) => {}
            Err(err) => return Err(err.into()),
        }
        self.write_record(&id, &doc)?;
        Ok(id)
    }

    pub fn get(&self, id: &[u8]) -> Result<Document> {
        match self.store.get(id) {
            Ok(bytes) => record::decode_document(&bytes),
            Err(StoreError::KeyNotFound) => {
                Err(Error::NotFound(format!("record in table {}", self.name)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a record and every index entry pointing at it.
    pub fn delete(&mut self, id: &[u8]) -> Result<()> {
        match self.store.delete(id) {
            Ok(()) => {}
            Err(StoreError::KeyNotFound) => {
                return Err(Error::NotFound(format!("record in table {}", self.name)))
            }
            Err(err) => return Err(err.into()),
        }
        for (_, index) in &mut self.indexes {
            index.delete_record(id)?;
        }
        Ok(())
    }

    /// Replaces a record under the same id: delete then insert. Fails with
    /// `NotFound` when the id does not exist; a failed insert restores the
    /// original record.
    pub fn replace(&mut self, id: &[u8], doc: Document) -> Result<()> {
        let old = self.get(id)?;
        let doc = self.apply_constraints(doc)?;
        self.delete(id)?;
        if let Err(err) = self.write_record(id, &doc) {
            let _ = self.write_record(id, &old);
            return Err(err);
        }
        Ok(())
    }

    /// Visits every record in ascending record-id order.
    pub fn iterate(&self, f: &mut dyn FnMut(&[u8], Document) -> Result<IterControl>) -> Result<()> {
        scan(&*self.store, None, false, &mut |key, value| {
            let doc = record::decode_document(value)?;
            f(key, doc)
        })
    }

    /// Deletes all records and clears all indexes.
    pub fn truncate(&mut self) -> Result<()> {
        self.store.truncate()?;
        for (_, index) in &mut self.indexes {
            index.truncate()?;
        }
        Ok(())
    }

    /// Appends `default` under `name` to every record missing the field.
    pub fn add_field(&mut self, name: &str, default: Value) -> Result<()> {
        let updates = self.rewrite_records(&mut |doc| {
            if doc.get(name).is_some() {
                return Ok(None);
            }
            let mut buf = FieldBuffer::from_document(doc);
            buf.add(name, default.clone())?;
            Ok(Some(buf.into_document()))
        })?;
        debug!(table = self.name.as_str(), field = name, records = updates, "added field");
        Ok(())
    }

    /// Removes the field from every record carrying it.
    pub fn delete_field(&mut self, name: &str) -> Result<()> {
        let updates = self.rewrite_records(&mut |doc| {
            if doc.get(name).is_none() {
                return Ok(None);
            }
            let mut buf = FieldBuffer::from_document(doc);
            buf.delete(name)?;
            Ok(Some(buf.into_document()))
        })?;
        debug!(table = self.name.as_str(), field = name, records = updates, "deleted field");
        Ok(())
    }

    /// Renames the field in every record carrying it.
    pub fn rename_field(&mut self, old: &str, new: &str) -> Result<()> {
        let updates = self.rewrite_records(&mut |doc| {
            if doc.get(old).is_none() {
                return Ok(None);
            }
            let mut buf = FieldBuffer::from_document(doc);
            buf.rename(old, new)?;
            Ok(Some(buf.into_document()))
        })?;
        debug!(
            table = self.name.as_str(),
            from = old,
            to = new,
            records = updates,
            "renamed field"
        );
        Ok(())
    }

    /// One schema-evolution pass: records are visited in ascending id order
    /// and rewritten where the closure returns a replacement. The first
    /// error aborts the whole pass.
    fn rewrite_records(
        &mut self,
        rewrite: &mut dyn FnMut(&Document) -> Result<Option<Document>>,
    ) -> Result<usize> {
        let mut updates = Vec::new();
        scan(&*self.store, None, false, &mut |key, value| {
            let doc = record::decode_document(value)?;
            if let Some(rewritten) = rewrite(&doc)? {
                updates.push((key.to_vec(), record::encode_document(&rewritten)?));
            }
            Ok(IterControl::Continue)
        })?;
        let count = updates.len();
        for (key, bytes) in updates {
            self.store.put(&key, &bytes)?;
        }
        Ok(count)
    }

    /// Rebuilds one index from a full table pass.
    pub fn reindex(&mut self, index_name: &str) -> Result<()> {
        let slot = self
            .indexes
            .iter()
            .position(|(name, _)| name == index_name)
            .ok_or_else(|| Error::NotFound(format!("index {}", index_name)))?;
        self.indexes[slot].1.truncate()?;

        let path = self.indexes[slot].1.config().path.clone();
        let unique = self.indexes[slot].1.config().unique;
        let mut entries = Vec::new();
        scan(&*self.store, None, false, &mut |key, value| {
            let doc = record::decode_document(value)?;
            match path.resolve_document(&doc) {
                Some(resolved) => entries.push((key.to_vec(), resolved.clone())),
                None if unique => entries.push((key.to_vec(), Value::Null)),
                None => {}
            }
            Ok(IterControl::Continue)
        })?;
        for (id, value) in entries {
            self.indexes[slot].1.set(&value, &id)?;
        }
        Ok(())
    }

    /// Writes the encoded record and maintains every index. On failure the
    /// record and the index entries written so far are removed again, so a
    /// rejected insert leaves no partial state behind.
    fn write_record(&mut self, id: &[u8], doc: &Document) -> Result<()> {
        let bytes = record::encode_document(doc)?;
        self.store.put(id, &bytes)?;

        let mut applied: Vec<(usize, Value)> = Vec::new();
        for slot in 0..self.indexes.len() {
            let value = match self.index_entry_value(slot, doc) {
                Some(value) => value,
                None => continue,
            };
            match self.indexes[slot].1.set(&value, id) {
                Ok(()) => applied.push((slot, value)),
                Err(err) => {
                    for (undo_slot, undo_value) in applied {
                        let _ = self.indexes[undo_slot].1.remove(&undo_value, id);
                    }
                    let _ = self.store.delete(id);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// The value a record contributes to an index. A missing path is
    /// skipped on non-unique indexes and indexed under null on unique ones,
    /// so two records both missing a uniquely-indexed path collide.
    fn index_entry_value(&self, slot: usize, doc: &Document) -> Option<Value> {
        let config = self.indexes[slot].1.config();
        match config.path.resolve_document(doc) {
            Some(value) => Some(value.clone()),
            None if config.unique => Some(Value::Null),
            None => None,
        }
    }

    /// Applies field constraints: fills defaults for missing fields,
    /// rejects nulls where forbidden, and converts present values to their
    /// declared kinds.
    fn apply_constraints(&self, doc: Document) -> Result<Document> {
        let mut doc = doc;
        for constraint in &self.config.constraints {
            match constraint.path.resolve_document(&doc).cloned() {
                None => {
                    if let Some(default) = &constraint.default {
                        constraint.path.set_in_document(&mut doc, default.clone())?;
                    } else if constraint.not_null {
                        return Err(Error::Constraint(format!(
                            "field {} must not be null",
                            constraint.path
                        )));
                    }
                }
                Some(value) if value.is_null() => {
                    if constraint.not_null {
                        return Err(Error::Constraint(format!(
                            "field {} must not be null",
                            constraint.path
                        )));
                    }
                }
                Some(value) => {
                    let converted = value.convert_to(constraint.kind)?;
                    if converted != value {
                        constraint.path.set_in_document(&mut doc, converted)?;
                    }
                }
            }
        }
        Ok(doc)
    }

    /// The record id for a document: the encoded primary-key value when the
    /// path resolves to a non-null value, a generated id otherwise.
    fn record_id_for(&self, doc: &Document) -> Result<Vec<u8>> {
        if let Some(pk) = &self.config.primary_key {
            if let Some(value) = pk.path.resolve_document(doc) {
                if !value.is_null() {
                    return encode_value(&value.convert_to(pk.kind)?);
                }
            }
        }
        Ok(new_record_id())
    }
}

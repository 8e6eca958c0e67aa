//! Secondary indexes: an ordered map from encoded field value to record id.
//!
//! Unique indexes key on the encoded value alone and store the record id as
//! the entry value, so a second `set` of the same value collides. Non-unique
//! indexes append `0x00` and the record id to the key, which keeps entries
//! for equal values adjacent while allowing many of them.

use vellum_engine::{IterControl, Store, StoreError, Transaction};

use super::{index_store_name, scan, Catalog, IndexConfig};
use crate::error::{Error, Result};
use crate::types::{decode_value_prefix, encode_value, Value};

pub struct Index<'a> {
    config: IndexConfig,
    store: Box<dyn Store + 'a>,
}

impl<'a> Index<'a> {
    /// Opens a named index within the transaction.
    pub fn open(tx: &'a dyn Transaction, name: &str) -> Result<Index<'a>> {
        let config = Catalog::index_config(tx, name)?;
        Self::from_config(tx, config)
    }

    pub(crate) fn from_config(tx: &'a dyn Transaction, config: IndexConfig) -> Result<Index<'a>> {
        let store = tx.get_store(&index_store_name(&config.table, &config.path))?;
        Ok(Index { config, store })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Converts a value to the indexed kind and encodes it. Bounds and
    /// entries go through the same conversion so they compare consistently.
    fn encode_indexed(&self, value: &Value) -> Result<Vec<u8>> {
        let converted = match self.config.kind {
            Some(kind) if !value.is_null() => value.convert_to(kind)?,
            _ => value.clone(),
        };
        encode_value(&converted)
    }

    /// Adds an entry pointing at `record_id`. Fails with `Duplicate` when a
    /// unique index already holds the value.
    pub fn set(&mut self, value: &Value, record_id: &[u8]) -> Result<()> {
        let encoded = self.encode_indexed(value)?;
        if self.config.unique {
            match self.store.get(&encoded) {
                Ok(_) => {
                    return Err(Error::Duplicate(format!(
                        "index on {}.{} already contains {}",
                        self.config.table, self.config.path, value
                    )))
                }
                Err(StoreError::KeyNotFound) => {}
                Err(err) => return Err(err.into()),
            }
            self.store.put(&encoded, record_id)?;
        } else {
            let mut key = encoded;
            key.push(0x00);
            key.extend_from_slice(record_id);
            self.store.put(&key, &[])?;
        }
        Ok(())
    }

    /// Removes the entry for a known `(value, record_id)` pair. Used to
    /// undo partial index writes; a missing entry is not an error.
    pub(crate) fn remove(&mut self, value: &Value, record_id: &[u8]) -> Result<()> {
        let mut key = self.encode_indexed(value)?;
        if !self.config.unique {
            key.push(0x00);
            key.extend_from_slice(record_id);
        }
        match self.store.delete(&key) {
            Ok(()) | Err(StoreError::KeyNotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes every entry pointing at `record_id`, scanning the index.
    pub fn delete_record(&mut self, record_id: &[u8]) -> Result<()> {
        let unique = self.config.unique;
        let mut stale = Vec::new();
        scan(&*self.store, None, false, &mut |key, value| {
            let points_here = if unique {
                value == record_id
            } else {
                matches!(split_entry_key(key), Ok((_, id)) if id == record_id)
            };
            if points_here {
                stale.push(key.to_vec());
            }
            Ok(IterControl::Continue)
        })?;
        for key in stale {
            self.store.delete(&key)?;
        }
        Ok(())
    }

    /// Visits `(value, record_id)` pairs with `value >= bound` in ascending
    /// value order; an exclusive bound skips entries equal to it.
    pub fn ascend_greater_or_equal(
        &self,
        bound: Option<(&Value, bool)>,
        f: &mut dyn FnMut(Value, &[u8]) -> Result<IterControl>,
    ) -> Result<()> {
        let pivot = match bound {
            Some((value, inclusive)) => {
                let mut pivot = self.encode_indexed(value)?;
                if !inclusive {
                    // Past every entry for the bound value: entry keys for
                    // it continue with 0x00 (non-unique) or end (unique).
                    pivot.push(0xFF);
                }
                Some(pivot)
            }
            None => None,
        };
        self.visit(pivot.as_deref(), false, None, f)
    }

    /// Visits `(value, record_id)` pairs with `value <= bound` in
    /// descending value order.
    pub fn descend_less_or_equal(
        &self,
        bound: Option<(&Value, bool)>,
        f: &mut dyn FnMut(Value, &[u8]) -> Result<IterControl>,
    ) -> Result<()> {
        let (pivot, exclude) = match bound {
            Some((value, inclusive)) => {
                let encoded = self.encode_indexed(value)?;
                if inclusive {
                    let mut pivot = encoded;
                    pivot.push(0xFF);
                    (Some(pivot), None)
                } else {
                    // Unique entry keys equal the bound encoding exactly and
                    // would be included by the engine's <= pivot; filter
                    // them out.
                    (Some(encoded.clone()), Some(encoded))
                }
            }
            None => (None, None),
        };
        self.visit(pivot.as_deref(), true, exclude, f)
    }

    fn visit(
        &self,
        pivot: Option<&[u8]>,
        descending: bool,
        exclude: Option<Vec<u8>>,
        f: &mut dyn FnMut(Value, &[u8]) -> Result<IterControl>,
    ) -> Result<()> {
        let unique = self.config.unique;
        scan(&*self.store, pivot, descending, &mut |key, value| {
            if let Some(excluded) = &exclude {
                if key == &excluded[..] {
                    return Ok(IterControl::Continue);
                }
            }
            let (decoded, record_id) = if unique {
                let (decoded, read) = decode_value_prefix(key)?;
                if read != key.len() {
                    return Err(Error::Codec("trailing bytes in unique index key".into()));
                }
                (decoded, value)
            } else {
                let (decoded, record_id) = split_entry_key(key)?;
                (decoded, record_id)
            };
            f(decoded, record_id)
        })
    }

    pub fn truncate(&mut self) -> Result<()> {
        self.store.truncate().map_err(Error::from)
    }
}

/// Splits a non-unique entry key back into its value and record id.
fn split_entry_key(key: &[u8]) -> Result<(Value, &[u8])> {
    let (value, read) = decode_value_prefix(key)?;
    match key.get(read) {
        Some(0x00) => Ok((value, &key[read + 1..])),
        _ => Err(Error::Codec("malformed index entry key".into())),
    }
}

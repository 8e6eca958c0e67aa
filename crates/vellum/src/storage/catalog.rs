//! Catalog: table and index metadata persisted inside reserved engine
//! stores, so DDL participates in transaction atomicity like any other
//! write.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vellum_engine::{IterControl, StoreError, Transaction};

use super::scan;
use crate::error::{Error, Result};
use crate::types::{Path, Value, ValueKind};

/// Store holding `table name -> bincode TableConfig`.
pub const TABLE_CONFIG_STORE: &[u8] = b"__vellum_tables";

/// Store holding `index name -> bincode IndexConfig`.
pub const INDEX_CONFIG_STORE: &[u8] = b"__vellum_indexes";

/// Names starting with this prefix are reserved for internal stores.
const RESERVED_PREFIX: &str = "__vellum_";

/// Name of the engine store backing an index.
pub fn index_store_name(table: &str, path: &Path) -> Vec<u8> {
    format!("__vellum_index_{}_{}", table, path).into_bytes()
}

/// Declared primary key: the value at `path`, converted to `kind`, becomes
/// the record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub path: Path,
    pub kind: ValueKind,
}

/// A per-path field constraint applied on insert and replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub path: Path,
    pub kind: ValueKind,
    pub not_null: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableConfig {
    pub primary_key: Option<PrimaryKey>,
    pub constraints: Vec<FieldConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub table: String,
    pub path: Path,
    pub unique: bool,
    /// Kind index entries are converted to before encoding. Populated from
    /// the table's field constraint on the same path, when one exists.
    pub kind: Option<ValueKind>,
}

pub struct Catalog;

impl Catalog {
    /// Creates the reserved metadata stores if this engine has none yet.
    pub fn setup(tx: &mut dyn Transaction) -> Result<()> {
        for name in [TABLE_CONFIG_STORE, INDEX_CONFIG_STORE] {
            match tx.create_store(name) {
                Ok(()) | Err(StoreError::StoreAlreadyExists(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    pub fn create_table(tx: &mut dyn Transaction, name: &str, config: &TableConfig) -> Result<()> {
        if name.starts_with(RESERVED_PREFIX) {
            return Err(Error::Constraint(format!(
                "table name {} uses the reserved prefix {}",
                name, RESERVED_PREFIX
            )));
        }
        let mut store = tx.get_store(TABLE_CONFIG_STORE)?;
        if store.get(name.as_bytes()).is_ok() {
            return Err(Error::AlreadyExists(format!("table {}", name)));
        }
        store.put(name.as_bytes(), &serialize(config)?)?;
        drop(store);
        tx.create_store(name.as_bytes())?;
        debug!(table = name, "created table");
        Ok(())
    }

    pub fn table_config(tx: &dyn Transaction, name: &str) -> Result<TableConfig> {
        let store = tx.get_store(TABLE_CONFIG_STORE)?;
        match store.get(name.as_bytes()) {
            Ok(bytes) => deserialize(&bytes),
            Err(StoreError::KeyNotFound) => Err(Error::NotFound(format!("table {}", name))),
            Err(err) => Err(err.into()),
        }
    }

    /// Drops a table, its record store, and every index declared on it.
    pub fn drop_table(tx: &mut dyn Transaction, name: &str) -> Result<()> {
        Self::table_config(tx, name)?;
        for (index_name, config) in Self::table_indexes(tx, name)? {
            tx.get_store(INDEX_CONFIG_STORE)?
                .delete(index_name.as_bytes())?;
            tx.drop_store(&index_store_name(&config.table, &config.path))?;
        }
        tx.get_store(TABLE_CONFIG_STORE)?.delete(name.as_bytes())?;
        tx.drop_store(name.as_bytes())?;
        debug!(table = name, "dropped table");
        Ok(())
    }

    pub fn create_index(tx: &mut dyn Transaction, name: &str, config: &IndexConfig) -> Result<()> {
        Self::table_config(tx, &config.table)?;
        let mut store = tx.get_store(INDEX_CONFIG_STORE)?;
        if store.get(name.as_bytes()).is_ok() {
            return Err(Error::AlreadyExists(format!("index {}", name)));
        }
        for (_, existing) in Self::table_indexes(tx, &config.table)? {
            if existing.path == config.path {
                return Err(Error::AlreadyExists(format!(
                    "index on {}.{}",
                    config.table, config.path
                )));
            }
        }
        store.put(name.as_bytes(), &serialize(config)?)?;
        drop(store);
        tx.create_store(&index_store_name(&config.table, &config.path))?;
        debug!(
            index = name,
            table = config.table.as_str(),
            path = %config.path,
            unique = config.unique,
            "created index"
        );
        Ok(())
    }

    pub fn index_config(tx: &dyn Transaction, name: &str) -> Result<IndexConfig> {
        let store = tx.get_store(INDEX_CONFIG_STORE)?;
        match store.get(name.as_bytes()) {
            Ok(bytes) => deserialize(&bytes),
            Err(StoreError::KeyNotFound) => Err(Error::NotFound(format!("index {}", name))),
            Err(err) => Err(err.into()),
        }
    }

    pub fn drop_index(tx: &mut dyn Transaction, name: &str) -> Result<()> {
        let config = Self::index_config(tx, name)?;
        tx.get_store(INDEX_CONFIG_STORE)?.delete(name.as_bytes())?;
        tx.drop_store(&index_store_name(&config.table, &config.path))?;
        debug!(index = name, "dropped index");
        Ok(())
    }

    /// All indexes declared on a table, with their names.
    pub fn table_indexes(
        tx: &dyn Transaction,
        table: &str,
    ) -> Result<Vec<(String, IndexConfig)>> {
        let store = tx.get_store(INDEX_CONFIG_STORE)?;
        let mut indexes = Vec::new();
        scan(&*store, None, false, &mut |key, value| {
            let config: IndexConfig = deserialize(value)?;
            if config.table == table {
                let name = String::from_utf8(key.to_vec())
                    .map_err(|_| Error::Codec("invalid utf-8 in index name".into()))?;
                indexes.push((name, config));
            }
            Ok(IterControl::Continue)
        })?;
        Ok(indexes)
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|err| Error::Codec(err.to_string()))
}

fn deserialize<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|err| Error::Codec(err.to_string()))
}

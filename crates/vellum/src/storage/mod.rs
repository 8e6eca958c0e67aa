//! The storage layer: catalog metadata, per-table record stores with
//! synchronous index maintenance, secondary indexes, and record-id
//! generation.

mod catalog;
mod index;
mod record_id;
mod table;

pub use catalog::{
    index_store_name, Catalog, FieldConstraint, IndexConfig, PrimaryKey, TableConfig,
};
pub use index::Index;
pub use record_id::new_record_id;
pub use table::Table;

use vellum_engine::{IterControl, Store};

use crate::error::{Error, Result};

/// Runs a store iteration with a callback that can fail with a core error.
/// Engine callbacks only speak `StoreError`, so the first core error is
/// parked, the scan stopped, and the error rethrown afterwards.
pub(crate) fn scan(
    store: &dyn Store,
    pivot: Option<&[u8]>,
    descending: bool,
    f: &mut dyn FnMut(&[u8], &[u8]) -> Result<IterControl>,
) -> Result<()> {
    let mut failure: Option<Error> = None;
    let mut wrapper = |key: &[u8], value: &[u8]| match f(key, value) {
        Ok(control) => Ok(control),
        Err(err) => {
            failure = Some(err);
            Ok(IterControl::Stop)
        }
    };
    let outcome = if descending {
        store.descend_less_or_equal(pivot, &mut wrapper)
    } else {
        store.ascend_greater_or_equal(pivot, &mut wrapper)
    };
    match failure {
        Some(err) => Err(err),
        None => outcome.map_err(Error::from),
    }
}

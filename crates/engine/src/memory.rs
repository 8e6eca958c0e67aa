//! In-memory engine backed by ordered maps.
//!
//! A writable transaction works on a private clone of the whole tree and
//! publishes it on commit, which makes commit/rollback trivially atomic.
//! The engine assumes a single writer at a time; concurrent writable
//! transactions would lose each other's updates on commit.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Engine, IterControl, IterFn, Result, Store, StoreError, Transaction};

type Tree = BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>;

/// An ordered in-memory engine. Cloning the handle shares the underlying
/// data.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    stores: Arc<Mutex<Tree>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MemoryEngine {
    fn begin(&self, writable: bool) -> Result<Box<dyn Transaction>> {
        let snapshot = self.stores.lock().clone();
        Ok(Box::new(MemoryTransaction {
            engine: Arc::clone(&self.stores),
            working: Arc::new(Mutex::new(snapshot)),
            writable,
        }))
    }
}

struct MemoryTransaction {
    engine: Arc<Mutex<Tree>>,
    working: Arc<Mutex<Tree>>,
    writable: bool,
}

impl Transaction for MemoryTransaction {
    fn commit(self: Box<Self>) -> Result<()> {
        if self.writable {
            *self.engine.lock() = self.working.lock().clone();
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn create_store(&mut self, name: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        let mut tree = self.working.lock();
        if tree.contains_key(name) {
            return Err(StoreError::StoreAlreadyExists(display_name(name)));
        }
        tree.insert(name.to_vec(), BTreeMap::new());
        Ok(())
    }

    fn get_store(&self, name: &[u8]) -> Result<Box<dyn Store + '_>> {
        if !self.working.lock().contains_key(name) {
            return Err(StoreError::StoreNotFound(display_name(name)));
        }
        Ok(Box::new(MemoryStore {
            name: name.to_vec(),
            working: Arc::clone(&self.working),
            writable: self.writable,
        }))
    }

    fn drop_store(&mut self, name: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        self.working
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::StoreNotFound(display_name(name)))
    }
}

struct MemoryStore {
    name: Vec<u8>,
    working: Arc<Mutex<Tree>>,
    writable: bool,
}

impl MemoryStore {
    fn with_entries<T>(&self, f: impl FnOnce(&BTreeMap<Vec<u8>, Vec<u8>>) -> T) -> Result<T> {
        let tree = self.working.lock();
        let entries = tree
            .get(&self.name)
            .ok_or_else(|| StoreError::StoreNotFound(display_name(&self.name)))?;
        Ok(f(entries))
    }

    fn with_entries_mut<T>(
        &mut self,
        f: impl FnOnce(&mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<T>,
    ) -> Result<T> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        let mut tree = self.working.lock();
        let entries = tree
            .get_mut(&self.name)
            .ok_or_else(|| StoreError::StoreNotFound(display_name(&self.name)))?;
        f(entries)
    }

    /// Snapshots the requested range so the callback can write back into the
    /// store without invalidating the iteration.
    fn snapshot_range(
        &self,
        bounds: (Bound<Vec<u8>>, Bound<Vec<u8>>),
        reverse: bool,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        fn as_slice(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
            match bound {
                Bound::Included(b) => Bound::Included(b.as_slice()),
                Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
                Bound::Unbounded => Bound::Unbounded,
            }
        }

        self.with_entries(|entries| {
            let range = entries.range::<[u8], _>((as_slice(&bounds.0), as_slice(&bounds.1)));
            let mut snapshot: Vec<_> = range.map(|(k, v)| (k.clone(), v.clone())).collect();
            if reverse {
                snapshot.reverse();
            }
            snapshot
        })
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.with_entries(|entries| entries.get(key).cloned())?
            .ok_or(StoreError::KeyNotFound)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_entries_mut(|entries| {
            entries.insert(key.to_vec(), value.to_vec());
            Ok(())
        })
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.with_entries_mut(|entries| {
            entries.remove(key).map(|_| ()).ok_or(StoreError::KeyNotFound)
        })
    }

    fn truncate(&mut self) -> Result<()> {
        self.with_entries_mut(|entries| {
            entries.clear();
            Ok(())
        })
    }

    fn ascend_greater_or_equal(&self, pivot: Option<&[u8]>, f: &mut IterFn) -> Result<()> {
        let lower = match pivot {
            Some(p) => Bound::Included(p.to_vec()),
            None => Bound::Unbounded,
        };
        let snapshot = self.snapshot_range((lower, Bound::Unbounded), false)?;
        for (key, value) in snapshot {
            if let IterControl::Stop = f(&key, &value)? {
                break;
            }
        }
        Ok(())
    }

    fn descend_less_or_equal(&self, pivot: Option<&[u8]>, f: &mut IterFn) -> Result<()> {
        let upper = match pivot {
            Some(p) => Bound::Included(p.to_vec()),
            None => Bound::Unbounded,
        };
        let snapshot = self.snapshot_range((Bound::Unbounded, upper), true)?;
        for (key, value) in snapshot {
            if let IterControl::Stop = f(&key, &value)? {
                break;
            }
        }
        Ok(())
    }
}

fn display_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(store: &mut dyn Store, key: &[u8], value: &[u8]) {
        store.put(key, value).unwrap();
    }

    #[test]
    fn put_get_delete() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin(true).unwrap();
        tx.create_store(b"s").unwrap();
        let mut store = tx.get_store(b"s").unwrap();

        put(&mut *store, b"a", b"1");
        assert_eq!(store.get(b"a").unwrap(), b"1");
        assert_eq!(store.get(b"missing"), Err(StoreError::KeyNotFound));

        store.delete(b"a").unwrap();
        assert_eq!(store.delete(b"a"), Err(StoreError::KeyNotFound));
    }

    #[test]
    fn iteration_is_key_ordered() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin(true).unwrap();
        tx.create_store(b"s").unwrap();
        {
            let mut store = tx.get_store(b"s").unwrap();
            for key in [&b"b"[..], b"a", b"c"] {
                put(&mut *store, key, b"");
            }
        }

        let store = tx.get_store(b"s").unwrap();
        let mut seen = Vec::new();
        store
            .ascend_greater_or_equal(Some(b"b"), &mut |k, _| {
                seen.push(k.to_vec());
                Ok(IterControl::Continue)
            })
            .unwrap();
        assert_eq!(seen, vec![b"b".to_vec(), b"c".to_vec()]);

        seen.clear();
        store
            .descend_less_or_equal(Some(b"b"), &mut |k, _| {
                seen.push(k.to_vec());
                Ok(IterControl::Continue)
            })
            .unwrap();
        assert_eq!(seen, vec![b"b".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn uncommitted_writes_are_invisible() {
        let engine = MemoryEngine::new();

        let mut tx = engine.begin(true).unwrap();
        tx.create_store(b"s").unwrap();
        tx.get_store(b"s").unwrap().put(b"k", b"v").unwrap();
        tx.rollback().unwrap();

        let tx = engine.begin(false).unwrap();
        assert!(tx.get_store(b"s").is_err());

        let mut tx = engine.begin(true).unwrap();
        tx.create_store(b"s").unwrap();
        tx.get_store(b"s").unwrap().put(b"k", b"v").unwrap();
        tx.commit().unwrap();

        let tx = engine.begin(false).unwrap();
        assert_eq!(tx.get_store(b"s").unwrap().get(b"k").unwrap(), b"v");
    }

    #[test]
    fn read_only_transactions_reject_writes() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin(true).unwrap();
        tx.create_store(b"s").unwrap();
        tx.commit().unwrap();

        let mut tx = engine.begin(false).unwrap();
        assert_eq!(tx.create_store(b"t"), Err(StoreError::ReadOnly));
        let mut store = tx.get_store(b"s").unwrap();
        assert_eq!(store.put(b"k", b"v"), Err(StoreError::ReadOnly));
    }

    #[test]
    fn callback_may_write_back_during_iteration() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin(true).unwrap();
        tx.create_store(b"s").unwrap();
        let mut store = tx.get_store(b"s").unwrap();
        for key in [&b"a"[..], b"b", b"c"] {
            put(&mut *store, key, b"0");
        }

        let mut writer = tx.get_store(b"s").unwrap();
        let reader = tx.get_store(b"s").unwrap();
        let mut visited = 0;
        reader
            .ascend_greater_or_equal(None, &mut |k, _| {
                writer.put(k, b"1")?;
                visited += 1;
                Ok(IterControl::Continue)
            })
            .unwrap();
        assert_eq!(visited, 3);
        assert_eq!(reader.get(b"b").unwrap(), b"1");
    }
}

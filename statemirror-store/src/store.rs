//! The indexed object store.

use crate::{IndexSpec, StoreError, StoreResult};
use statemirror_types::{ObjectKey, WatchObject};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A local, thread-safe, indexed mapping from object identity to the latest
/// known object value.
///
/// Multiple readers proceed concurrently; mutations are serialized. Secondary
/// indexes are recomputed incrementally for the changed identity on every
/// mutation, so lookups always reflect the latest applied value.
pub struct IndexedStore<T: WatchObject> {
    specs: Vec<IndexSpec<T>>,
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    objects: HashMap<ObjectKey, T>,
    /// index name -> computed key -> identities holding that key.
    indexes: HashMap<String, HashMap<String, BTreeSet<ObjectKey>>>,
}

impl<T: WatchObject> Default for IndexedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WatchObject> IndexedStore<T> {
    /// Creates a store with no secondary indexes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            inner: RwLock::new(Inner {
                objects: HashMap::new(),
                indexes: HashMap::new(),
            }),
        }
    }

    /// Creates a store with the given secondary indexes.
    pub fn with_indexes(specs: Vec<IndexSpec<T>>) -> StoreResult<Self> {
        let mut indexes = HashMap::new();
        for spec in &specs {
            if indexes.insert(spec.name().to_string(), HashMap::new()).is_some() {
                return Err(StoreError::DuplicateIndex(spec.name().to_string()));
            }
        }
        Ok(Self {
            specs,
            inner: RwLock::new(Inner {
                objects: HashMap::new(),
                indexes,
            }),
        })
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Inserts an object, replacing any previous value for its identity.
    pub fn add(&self, object: &T) -> StoreResult<()> {
        self.upsert(object)
    }

    /// Updates an object. An update for an absent identity is an add.
    pub fn update(&self, object: &T) -> StoreResult<()> {
        self.upsert(object)
    }

    /// Removes the object with this object's identity, returning the removed
    /// value. Deleting an absent identity is a no-op.
    pub fn delete(&self, object: &T) -> StoreResult<Option<T>> {
        let key = object.key()?;
        Ok(self.delete_by_key(&key))
    }

    /// Removes the object stored under `key`, returning the removed value.
    pub fn delete_by_key(&self, key: &ObjectKey) -> Option<T> {
        let mut inner = self.write();
        let old = inner.objects.remove(key)?;
        for spec in &self.specs {
            let old_keys = spec.keys_for(&old);
            if let Some(buckets) = inner.indexes.get_mut(spec.name()) {
                remove_from_buckets(buckets, key, &old_keys);
            }
        }
        Some(old)
    }

    fn upsert(&self, object: &T) -> StoreResult<()> {
        let key = object.key()?;
        let keys_per_spec: Vec<Vec<String>> =
            self.specs.iter().map(|s| s.keys_for(object)).collect();

        let mut inner = self.write();

        // Unique-index collisions fail the whole mutation before anything
        // is touched, keeping store and indexes consistent with each other.
        for (spec, new_keys) in self.specs.iter().zip(&keys_per_spec) {
            if !spec.is_unique() {
                continue;
            }
            if let Some(buckets) = inner.indexes.get(spec.name()) {
                for index_key in new_keys {
                    let holder = buckets
                        .get(index_key)
                        .and_then(|set| set.iter().find(|k| *k != &key));
                    if let Some(existing) = holder {
                        return Err(StoreError::IndexKeyCollision {
                            index: spec.name().to_string(),
                            key: index_key.clone(),
                            existing: existing.clone(),
                        });
                    }
                }
            }
        }

        let old = inner.objects.insert(key.clone(), object.clone());
        for (spec, new_keys) in self.specs.iter().zip(&keys_per_spec) {
            let old_keys = old.as_ref().map(|o| spec.keys_for(o)).unwrap_or_default();
            if let Some(buckets) = inner.indexes.get_mut(spec.name()) {
                remove_from_buckets(buckets, &key, &old_keys);
                for index_key in new_keys {
                    buckets
                        .entry(index_key.clone())
                        .or_default()
                        .insert(key.clone());
                }
            }
        }
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Returns the latest value stored for `key`.
    pub fn get(&self, key: &ObjectKey) -> Option<T> {
        self.read().objects.get(key).cloned()
    }

    /// Returns whether an object is stored under `key`.
    pub fn contains_key(&self, key: &ObjectKey) -> bool {
        self.read().objects.contains_key(key)
    }

    /// Returns every stored identity.
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.read().objects.keys().cloned().collect()
    }

    /// Returns every stored identity with its current value.
    pub fn snapshot(&self) -> Vec<(ObjectKey, T)> {
        self.read()
            .objects
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().objects.is_empty()
    }

    /// Returns the identities whose current value computes `index_key` on
    /// the named index, in deterministic (sorted) order.
    pub fn by_index(&self, index: &str, index_key: &str) -> StoreResult<Vec<ObjectKey>> {
        let inner = self.read();
        let buckets = inner
            .indexes
            .get(index)
            .ok_or_else(|| StoreError::UnknownIndex(index.to_string()))?;
        Ok(buckets
            .get(index_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Returns every computed key currently present on the named index.
    pub fn index_keys(&self, index: &str) -> StoreResult<Vec<String>> {
        let inner = self.read();
        let buckets = inner
            .indexes
            .get(index)
            .ok_or_else(|| StoreError::UnknownIndex(index.to_string()))?;
        let mut keys: Vec<String> = buckets.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    // A poisoned lock would only repeat the original panic; take the guard.
    fn read(&self) -> RwLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn remove_from_buckets(
    buckets: &mut HashMap<String, BTreeSet<ObjectKey>>,
    key: &ObjectKey,
    index_keys: &[String],
) {
    for index_key in index_keys {
        if let Some(set) = buckets.get_mut(index_key) {
            set.remove(key);
            if set.is_empty() {
                buckets.remove(index_key);
            }
        }
    }
}

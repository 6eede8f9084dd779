//! Local store: the controller's mirror of one remote collection.
//!
//! A [`Store`] maps [`ObjectKey`] to the most recent snapshot seen for that
//! object. It has exactly one writer (the reflector); handlers and other
//! readers get a [`Reader`]. Every operation takes the lock once, so readers
//! never see a half-applied [`Store::replace_all`]. The lock is never held
//! across an `.await`.

use crate::dispatcher::Notification;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identity of an object within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    /// Namespace; `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Build a key from its parts.
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Derive the key of a resource from its metadata.
    pub fn from_resource<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

type Snapshots<K> = BTreeMap<ObjectKey, Arc<K>>;

/// Result of [`Store::replace_all`].
#[derive(Debug)]
pub struct ReplaceDelta<K> {
    /// Keys present after the swap but not before
    pub added: Vec<ObjectKey>,
    /// Keys present before the swap but not after
    pub removed: Vec<ObjectKey>,
    /// Notifications in delivery order: list order first, then removals in key order
    pub notifications: Vec<Notification<K>>,
}

/// Concurrency-safe key/snapshot map.
#[derive(Debug)]
pub struct Store<K> {
    inner: Arc<RwLock<Snapshots<K>>>,
}

impl<K> Clone for Store<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for Store<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Store<K> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    // A panicking handler never holds this lock, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Snapshots<K>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshots<K>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-only handle sharing this store's contents.
    pub fn reader(&self) -> Reader<K> {
        Reader { store: self.clone() }
    }

    /// Insert or replace a snapshot, returning the previous one.
    pub fn upsert(&self, key: ObjectKey, obj: Arc<K>) -> Option<Arc<K>> {
        self.write().insert(key, obj)
    }

    /// Remove a snapshot, returning the last known state.
    pub fn delete(&self, key: &ObjectKey) -> Option<Arc<K>> {
        self.write().remove(key)
    }

    /// Current snapshot for `key`.
    pub fn get(&self, key: &ObjectKey) -> Option<Arc<K>> {
        self.read().get(key).cloned()
    }

    /// Every snapshot, ordered by key.
    pub fn list(&self) -> Vec<Arc<K>> {
        self.read().values().cloned().collect()
    }

    /// Every key, ordered.
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.read().keys().cloned().collect()
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Atomically swap the whole contents for `items`.
    ///
    /// If a key appears more than once, the last occurrence wins. Keys present
    /// both before and after yield an update notification even when unchanged.
    pub fn replace_all(&self, items: Vec<(ObjectKey, Arc<K>)>) -> ReplaceDelta<K> {
        let mut next: Snapshots<K> = BTreeMap::new();
        let mut order = Vec::with_capacity(items.len());
        for (key, obj) in items {
            if next.insert(key.clone(), obj).is_none() {
                order.push(key);
            }
        }

        let mut current = self.write();
        let mut added = Vec::new();
        let mut notifications = Vec::with_capacity(order.len());

        for key in order {
            let Some(new) = next.get(&key).cloned() else {
                continue;
            };
            match current.get(&key) {
                Some(old) => notifications.push(Notification::Update {
                    old: Arc::clone(old),
                    new,
                }),
                None => {
                    added.push(key);
                    notifications.push(Notification::Add(new));
                }
            }
        }

        let mut removed = Vec::new();
        for (key, old) in current.iter() {
            if !next.contains_key(key) {
                removed.push(key.clone());
                notifications.push(Notification::Delete(Arc::clone(old)));
            }
        }

        *current = next;

        ReplaceDelta {
            added,
            removed,
            notifications,
        }
    }
}

/// Read-only view of a [`Store`], handed to handlers and probes.
#[derive(Debug)]
pub struct Reader<K> {
    store: Store<K>,
}

impl<K> Clone for Reader<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K> Reader<K> {
    /// Current snapshot for `key`.
    pub fn get(&self, key: &ObjectKey) -> Option<Arc<K>> {
        self.store.get(key)
    }

    /// Every snapshot, ordered by key.
    pub fn list(&self) -> Vec<Arc<K>> {
        self.store.list()
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

//! The delta buffer: an ordered, deduplicating queue of pending changes
//! keyed by object identity.
//!
//! Deltas for one identity accumulate into a group and are drained together,
//! so a consumer always applies a causally ordered run of changes for one
//! object without interleaving another object's changes mid-update. Groups
//! are served first-enqueued-first among identities with pending deltas.

use crate::InformerResult;
use statemirror_types::{Delta, ObjectKey, WatchObject};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::debug;

/// One drained delta group, ready for processing.
#[derive(Debug)]
pub struct PoppedGroup<T> {
    /// The identity all deltas in the group belong to.
    pub key: ObjectKey,
    /// The pending deltas, in arrival order.
    pub deltas: Vec<Delta<T>>,
    /// Whether this identity was part of the initial full listing and is
    /// being drained for the first time.
    pub is_in_initial_list: bool,
}

/// An ordered, deduplicating buffer of pending changes keyed by identity.
///
/// `pop` is intended for a single consumer (the reconciler loop); `enqueue`
/// is safe for any number of concurrent producers.
pub struct DeltaQueue<T> {
    inner: Mutex<QueueInner<T>>,
    ready: Notify,
}

struct QueueInner<T> {
    /// Pending deltas per identity. A key may have an entry while in flight;
    /// those deltas are re-queued by `done`.
    groups: HashMap<ObjectKey, VecDeque<Delta<T>>>,
    /// Identities with a pending group, in first-enqueued order.
    order: VecDeque<ObjectKey>,
    /// Identities popped but not yet marked done.
    in_flight: HashSet<ObjectKey>,
    /// Identities seeded by the initial listing whose first group has not
    /// been fully processed (popped and marked done).
    initial_population: HashSet<ObjectKey>,
    /// Whether the initial listing has been delivered via `replace`.
    populated: bool,
    shut_down: bool,
}

impl<T: WatchObject> Default for DeltaQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WatchObject> DeltaQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                groups: HashMap::new(),
                order: VecDeque::new(),
                in_flight: HashSet::new(),
                initial_population: HashSet::new(),
                populated: false,
                shut_down: false,
            }),
            ready: Notify::new(),
        }
    }

    /// Appends a delta to the pending group for its identity, creating the
    /// group if absent. Enqueues after shutdown are discarded.
    pub fn enqueue(&self, delta: Delta<T>) -> InformerResult<()> {
        let key = delta.object.key()?;
        let mut inner = self.lock();
        if inner.shut_down {
            debug!(%key, "discarding delta enqueued after shutdown");
            return Ok(());
        }
        push_delta(&mut inner, key, delta);
        drop(inner);
        self.ready.notify_one();
        Ok(())
    }

    /// Seeds the queue from a full listing: one `Sync` delta per listed
    /// object, plus one `Deleted` delta for every known object absent from
    /// the listing. The listed identities become the initial population
    /// tracked by [`has_synced`](Self::has_synced).
    pub fn replace(
        &self,
        listing: Vec<T>,
        known: Vec<(ObjectKey, T)>,
    ) -> InformerResult<()> {
        let mut listed = Vec::with_capacity(listing.len());
        for object in listing {
            listed.push((object.key()?, object));
        }
        let listed_keys: HashSet<ObjectKey> = listed.iter().map(|(k, _)| k.clone()).collect();

        let mut inner = self.lock();
        if inner.shut_down {
            return Ok(());
        }
        let mut population = HashSet::new();
        for (key, object) in listed {
            population.insert(key.clone());
            push_delta(&mut inner, key, Delta::sync(object));
        }
        for (key, object) in known {
            if listed_keys.contains(&key) {
                continue;
            }
            population.insert(key.clone());
            push_delta(&mut inner, key, Delta::deleted(object));
        }
        inner.initial_population = population;
        inner.populated = true;
        drop(inner);
        self.ready.notify_one();
        Ok(())
    }

    /// Enqueues a `Sync` delta for every given object whose group has no
    /// pending deltas. Identities with pending changes are skipped so a
    /// resync never overtakes a genuine change.
    pub fn resync(&self, objects: Vec<T>) -> InformerResult<()> {
        let mut keyed = Vec::with_capacity(objects.len());
        for object in objects {
            keyed.push((object.key()?, object));
        }

        let mut inner = self.lock();
        if inner.shut_down {
            return Ok(());
        }
        let mut pushed = false;
        for (key, object) in keyed {
            if inner.groups.get(&key).is_some_and(|g| !g.is_empty()) {
                continue;
            }
            push_delta(&mut inner, key, Delta::sync(object));
            pushed = true;
        }
        drop(inner);
        if pushed {
            self.ready.notify_one();
        }
        Ok(())
    }

    /// Drains and returns the oldest ready delta group, suspending while
    /// none is ready. Returns `None` only after [`shut_down`](Self::shut_down)
    /// once the buffer is empty.
    pub async fn pop(&self) -> Option<PoppedGroup<T>> {
        loop {
            let notified = self.ready.notified();
            {
                let mut inner = self.lock();
                if let Some(key) = inner.order.pop_front() {
                    let deltas = inner.groups.remove(&key).unwrap_or_default();
                    inner.in_flight.insert(key.clone());
                    let is_in_initial_list = inner.initial_population.contains(&key);
                    return Some(PoppedGroup {
                        key,
                        deltas: Vec::from(deltas),
                        is_in_initial_list,
                    });
                }
                if inner.shut_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Marks a popped group's identity as processed, completing its initial-
    /// population accounting. Deltas that arrived for the identity while it
    /// was in flight become a fresh pending group.
    pub fn done(&self, key: &ObjectKey) {
        let mut inner = self.lock();
        if !inner.in_flight.remove(key) {
            return;
        }
        inner.initial_population.remove(key);
        if inner.groups.get(key).is_some_and(|g| !g.is_empty()) {
            inner.order.push_back(key.clone());
            drop(inner);
            self.ready.notify_one();
        }
    }

    /// Reports whether every identity seeded by the initial listing has been
    /// popped and marked done. While an initial group is in flight this stays
    /// false, so a true result means the store and the handler have already
    /// seen the whole listing.
    pub fn has_synced(&self) -> bool {
        let inner = self.lock();
        inner.populated && inner.initial_population.is_empty()
    }

    /// Raises the shutdown signal: wakes any suspended `pop`, which will
    /// drain remaining groups and then yield `None`.
    pub fn shut_down(&self) {
        self.lock().shut_down = true;
        self.ready.notify_waiters();
        self.ready.notify_one();
    }

    /// Reports whether the queue has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    // A poisoned lock would only repeat the original panic; take the guard.
    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn push_delta<T>(inner: &mut QueueInner<T>, key: ObjectKey, delta: Delta<T>) {
    let group = inner.groups.entry(key.clone()).or_default();
    let was_empty = group.is_empty();
    group.push_back(delta);
    if was_empty && !inner.in_flight.contains(&key) {
        inner.order.push_back(key);
    }
}

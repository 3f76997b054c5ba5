//! Background cache-integrity checking.
//!
//! Cached values are cloned on the way out of the store, so a handler can
//! only corrupt the cache through shared interior state (an `Arc`-backed
//! field mutated in place). The detector snapshots a serialized form of
//! every object handed to a handler and periodically re-serializes a
//! retained copy; a mismatch means some consumer mutated a cached object.
//!
//! Detection exists purely to catch programming errors in handler
//! implementations. It is a no-op unless enabled, which is intended for
//! verification and test configurations only.

use crate::{InformerResult, WatchObject};
use statemirror_types::ObjectKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error};

/// A handler mutated a cached object in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cached object {key} was mutated after being handed to a handler")]
pub struct MutationError {
    /// The identity of the mutated object.
    pub key: ObjectKey,
}

struct Observed<T> {
    snapshot: serde_json::Value,
    live: T,
}

/// Periodically verifies that objects handed to handlers have not been
/// mutated in place.
///
/// One entry is kept per identity; re-observing an identity replaces its
/// snapshot, so the registry stays bounded by the mirror's size across
/// resyncs.
pub struct MutationDetector<T> {
    enabled: bool,
    observed: Mutex<HashMap<ObjectKey, Observed<T>>>,
}

impl<T: WatchObject> MutationDetector<T> {
    /// Creates a detector. When disabled, every operation is a no-op.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            observed: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the detector is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Takes a snapshot of an object at the moment it is handed to a
    /// handler, replacing any earlier snapshot for the same identity.
    pub fn observe(&self, object: &T) -> InformerResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let key = object.key()?;
        let snapshot = serde_json::to_value(object)?;
        self.lock().insert(
            key,
            Observed {
                snapshot,
                live: object.clone(),
            },
        );
        Ok(())
    }

    /// Re-serializes every observed object and compares against its
    /// snapshot. Returns the first mismatch found.
    pub fn check(&self) -> InformerResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let observed = self.lock();
        for (key, entry) in observed.iter() {
            let current = serde_json::to_value(&entry.live)?;
            if current != entry.snapshot {
                error!(%key, "cached object mutated in place");
                return Err(MutationError { key: key.clone() }.into());
            }
        }
        Ok(())
    }

    /// Runs the periodic check loop until the stop signal is raised. A
    /// detected mutation is returned as a fatal error.
    pub async fn run(
        &self,
        period: Duration,
        mut stop: watch::Receiver<bool>,
    ) -> InformerResult<()> {
        if !self.enabled {
            return Ok(());
        }
        debug!(?period, "mutation detector running");
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => self.check()?,
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        // One final pass so a mutation observed just before
                        // shutdown is still reported.
                        self.check()?;
                        return Ok(());
                    }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectKey, Observed<T>>> {
        self.observed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

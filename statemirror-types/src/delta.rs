//! Deltas: observed changes to watched objects.
//!
//! A delta is one observed change for one identity. Deltas for the same
//! identity are ordered by arrival; `Sync` applies like `Updated` but marks
//! a periodic re-affirmation rather than a genuine remote change.

use serde::{Deserialize, Serialize};

/// The kind of change a delta represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeltaKind {
    /// The object appeared.
    Added,
    /// The object changed.
    Updated,
    /// The object vanished.
    Deleted,
    /// Periodic re-affirmation of a known object; applies like `Updated`.
    Sync,
}

/// A single observed change for one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta<T> {
    /// What happened.
    pub kind: DeltaKind,
    /// The object as observed. For `Deleted` this is the last known value.
    pub object: T,
}

impl<T> Delta<T> {
    /// Creates a delta.
    #[must_use]
    pub fn new(kind: DeltaKind, object: T) -> Self {
        Self { kind, object }
    }

    /// Creates an `Added` delta.
    #[must_use]
    pub fn added(object: T) -> Self {
        Self::new(DeltaKind::Added, object)
    }

    /// Creates an `Updated` delta.
    #[must_use]
    pub fn updated(object: T) -> Self {
        Self::new(DeltaKind::Updated, object)
    }

    /// Creates a `Deleted` delta.
    #[must_use]
    pub fn deleted(object: T) -> Self {
        Self::new(DeltaKind::Deleted, object)
    }

    /// Creates a `Sync` delta.
    #[must_use]
    pub fn sync(object: T) -> Self {
        Self::new(DeltaKind::Sync, object)
    }
}

/// A raw change notification from a source's incremental stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<T> {
    /// An object appeared.
    Added(T),
    /// An object changed.
    Updated(T),
    /// An object vanished.
    Deleted(T),
}

impl<T> WatchEvent<T> {
    /// Returns the object carried by the event.
    pub fn object(&self) -> &T {
        match self {
            Self::Added(o) | Self::Updated(o) | Self::Deleted(o) => o,
        }
    }

    /// Converts the event into the delta it implies.
    #[must_use]
    pub fn into_delta(self) -> Delta<T> {
        match self {
            Self::Added(o) => Delta::added(o),
            Self::Updated(o) => Delta::updated(o),
            Self::Deleted(o) => Delta::deleted(o),
        }
    }
}

//! The contract cached objects must satisfy.

use crate::{ObjectKey, Result};
use serde::Serialize;

/// A remote-held object the engine can mirror locally.
///
/// Implementations expose the two identity parts the key is derived from.
/// Objects are cloned on the way in and out of the cache and serialized for
/// mutation snapshots, hence the `Clone + Serialize` bounds. Handlers must
/// treat every object they receive as immutable.
pub trait WatchObject: Clone + Send + Sync + Serialize + 'static {
    /// The namespace-like scope the object lives in, if any.
    fn scope(&self) -> Option<&str>;

    /// The object's name, unique within its scope.
    fn name(&self) -> &str;

    /// The object's canonical identity key.
    fn key(&self) -> Result<ObjectKey> {
        ObjectKey::from_parts(self.scope(), self.name())
    }
}

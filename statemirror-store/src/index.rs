//! Secondary index declarations.

use std::fmt;
use std::sync::Arc;

/// A pure function computing the index keys an object maps to.
///
/// An object may map to zero keys (it is simply absent from that index) or
/// several. The function must depend only on object content.
pub type IndexKeyFn<T> = Arc<dyn Fn(&T) -> Vec<String> + Send + Sync>;

/// Declaration of one secondary index, fixed at store construction time.
pub struct IndexSpec<T> {
    name: String,
    key_fn: IndexKeyFn<T>,
    unique: bool,
}

impl<T> IndexSpec<T> {
    /// Declares an index. Multiple identities may share a computed key.
    pub fn new(
        name: impl Into<String>,
        key_fn: impl Fn(&T) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            key_fn: Arc::new(key_fn),
            unique: false,
        }
    }

    /// Declares a unique index: a computed key may be held by at most one
    /// identity, and a mutation that would violate this fails with
    /// [`StoreError::IndexKeyCollision`](crate::StoreError::IndexKeyCollision).
    pub fn unique(
        name: impl Into<String>,
        key_fn: impl Fn(&T) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            key_fn: Arc::new(key_fn),
            unique: true,
        }
    }

    /// The index's name, used for lookups.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the index enforces one identity per key.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub(crate) fn keys_for(&self, object: &T) -> Vec<String> {
        (self.key_fn)(object)
    }
}

impl<T> Clone for IndexSpec<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            key_fn: Arc::clone(&self.key_fn),
            unique: self.unique,
        }
    }
}

impl<T> fmt::Debug for IndexSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSpec")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .finish_non_exhaustive()
    }
}

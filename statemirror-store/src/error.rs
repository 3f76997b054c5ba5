//! Error types for the store layer.

use statemirror_types::ObjectKey;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup against an index that was never declared.
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// Two index specs were declared with the same name.
    #[error("duplicate index name: {0}")]
    DuplicateIndex(String),

    /// A unique index computed a key already held by a different identity.
    #[error("index {index:?} key {key:?} already held by {existing}")]
    IndexKeyCollision {
        /// The index the collision occurred on.
        index: String,
        /// The computed key that collided.
        key: String,
        /// The identity that already holds the key.
        existing: ObjectKey,
    },

    /// Identity key derivation failed.
    #[error("key error: {0}")]
    Key(#[from] statemirror_types::Error),
}

//! Error types for the informer.

use crate::mutation::MutationError;
use thiserror::Error;

/// Result type for informer operations.
pub type InformerResult<T> = Result<T, InformerError>;

/// Errors that can occur while running the informer.
#[derive(Debug, Error)]
pub enum InformerError {
    /// The source failed to produce a listing or a watch stream.
    #[error("source error: {0}")]
    Source(String),

    /// The source's change stream ended. Fatal: the mirror is stale until a
    /// fresh listing succeeds.
    #[error("watch stream closed")]
    WatchClosed,

    /// A store mutation failed. Fatal for the affected delta group.
    #[error("store error: {0}")]
    Store(#[from] statemirror_store::StoreError),

    /// Identity key derivation failed for a delta's object.
    #[error("key error: {0}")]
    Key(#[from] statemirror_types::Error),

    /// Snapshot serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A handler mutated a cached object in place.
    #[error("cache integrity violation: {0}")]
    Mutation(#[from] MutationError),

    /// The transform step rejected an object.
    #[error("transform error: {0}")]
    Transform(String),
}

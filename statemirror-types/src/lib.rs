//! Core type definitions for statemirror.
//!
//! This crate defines the fundamental, domain-agnostic types used throughout
//! the mirror engine:
//! - Object identity keys with an explicit scope/name derivation rule
//! - The `WatchObject` contract cached objects must satisfy
//! - Deltas (observed changes) and watch events (raw source notifications)
//!
//! All domain-specific object types belong to the application embedding the
//! engine, not here.

mod delta;
mod key;
mod object;

pub use delta::{Delta, DeltaKind, WatchEvent};
pub use key::{labels_key, ObjectKey};
pub use object::WatchObject;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

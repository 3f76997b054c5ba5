//! Thread-safe indexed object cache for statemirror.
//!
//! Provides [`IndexedStore`], the locally materialized mirror of remote
//! state: a readers-writer-locked map from identity to the latest applied
//! object value, plus secondary indexes computed from object content.
//!
//! # Architecture
//!
//! - Identities are [`ObjectKey`]s derived from each object
//! - Secondary indexes are declared at construction as pure key functions
//!   and maintained incrementally on every mutation, never rebuilt
//! - Callers obtain the store only through explicit handles; there is no
//!   ambient global state
//!
//! [`ObjectKey`]: statemirror_types::ObjectKey

mod error;
mod index;
mod store;

pub use error::{StoreError, StoreResult};
pub use index::{IndexKeyFn, IndexSpec};
pub use store::IndexedStore;

//! Watch-to-cache reconciliation engine for statemirror.
//!
//! Consumes an unbounded, possibly out-of-order stream of change
//! notifications about remote-held objects and maintains a locally
//! materialized, indexable, eventually-consistent mirror of that state,
//! notifying a handler of every observed transition exactly once and in
//! causal order per object.
//!
//! # Architecture
//!
//! - **DeltaQueue**: buffers pending changes, grouped by object identity
//! - **WatchSource**: supplies the initial full listing and the ongoing
//!   change stream
//! - **Informer**: pops delta groups, applies them to the store, and
//!   dispatches handler callbacks
//! - **MutationDetector**: background integrity checker catching handlers
//!   that mutate cached objects in place
//!
//! Data flows source → queue → informer → store, with the handler invoked
//! after each store mutation. A single `tokio::sync::watch` stop channel
//! shuts every loop down deterministically; the in-flight delta group
//! always completes before `run` returns.
//!
//! # Example
//!
//! ```no_run
//! use serde::Serialize;
//! use statemirror_informer::{mock::MockSource, HandlerFns, Informer, InformerConfig};
//! use statemirror_store::IndexedStore;
//! use statemirror_types::WatchObject;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize)]
//! struct Endpoint {
//!     name: String,
//!     address: String,
//! }
//!
//! impl WatchObject for Endpoint {
//!     fn scope(&self) -> Option<&str> {
//!         None
//!     }
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//! }
//!
//! # async fn demo() -> statemirror_informer::InformerResult<()> {
//! let (source, _feed) = MockSource::new(vec![Endpoint {
//!     name: "gateway".into(),
//!     address: "10.0.0.1".into(),
//! }]);
//! let handler = HandlerFns::new()
//!     .on_add(|ep: &Endpoint, initial| println!("+ {} (initial: {initial})", ep.name));
//!
//! let store = Arc::new(IndexedStore::new());
//! let informer = Informer::new(source, handler, store, InformerConfig::default());
//!
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let handle = informer.handle();
//! tokio::spawn(informer.run(stop_rx));
//! // ... later:
//! let _ = handle.has_synced();
//! let _ = stop_tx.send(true);
//! # Ok(())
//! # }
//! ```

mod delta_queue;
mod error;
mod handler;
mod informer;
mod mutation;
mod source;

pub use delta_queue::{DeltaQueue, PoppedGroup};
pub use error::{InformerError, InformerResult};
pub use handler::{EventHandler, HandlerFns};
pub use informer::{Informer, InformerConfig, InformerHandle, TransformFn};
pub use mutation::{MutationDetector, MutationError};
pub use source::{mock, WatchSource, WatchStream};

pub use statemirror_types::{Delta, DeltaKind, ObjectKey, WatchEvent, WatchObject};

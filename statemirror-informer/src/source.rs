//! The source: the collaborator supplying remote state.
//!
//! A source provides a one-shot full listing plus an ongoing stream of
//! incremental change notifications. Listing failures are fatal at startup;
//! stream failures are fatal at any later point — reconnect strategies
//! belong to the source implementation, not to the engine.

use crate::{InformerError, InformerResult};
use async_trait::async_trait;
use statemirror_types::WatchEvent;
use tokio::sync::mpsc;

/// An ongoing stream of incremental change notifications.
///
/// The stream ends when the source closes its sending side; the engine
/// treats that as fatal.
pub struct WatchStream<T> {
    rx: mpsc::Receiver<WatchEvent<T>>,
}

impl<T> WatchStream<T> {
    /// Wraps an existing receiver.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<WatchEvent<T>>) -> Self {
        Self { rx }
    }

    /// Creates a connected sender/stream pair.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<WatchEvent<T>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    /// Receives the next change notification, or `None` once the stream has
    /// ended.
    pub async fn next(&mut self) -> Option<WatchEvent<T>> {
        self.rx.recv().await
    }
}

/// A collaborator supplying an initial full listing and an ongoing stream of
/// incremental changes.
#[async_trait]
pub trait WatchSource<T>: Send + Sync {
    /// Produces a complete enumeration of all currently existing objects.
    async fn list(&self) -> InformerResult<Vec<T>>;

    /// Opens the incremental change stream. Called once, after `list`.
    async fn watch(&self) -> InformerResult<WatchStream<T>>;
}

/// A scriptable source for tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// A mock source: serves a fixed listing and a hand-fed change stream.
    pub struct MockSource<T> {
        listing: Mutex<Vec<T>>,
        list_error: Option<String>,
        stream: Mutex<Option<WatchStream<T>>>,
    }

    /// The feeding side of a [`MockSource`]'s change stream. Dropping every
    /// handle (or calling [`close`](Self::close)) ends the stream.
    #[derive(Clone)]
    pub struct MockSourceHandle<T> {
        tx: mpsc::Sender<WatchEvent<T>>,
    }

    impl<T: Clone + Send> MockSource<T> {
        /// Creates a source serving `listing` plus a stream fed through the
        /// returned handle.
        pub fn new(listing: Vec<T>) -> (Self, MockSourceHandle<T>) {
            let (tx, stream) = WatchStream::channel(64);
            (
                Self {
                    listing: Mutex::new(listing),
                    list_error: None,
                    stream: Mutex::new(Some(stream)),
                },
                MockSourceHandle { tx },
            )
        }

        /// Makes `list` fail with the given message.
        #[must_use]
        pub fn fail_list(mut self, message: impl Into<String>) -> Self {
            self.list_error = Some(message.into());
            self
        }
    }

    impl<T> MockSourceHandle<T> {
        /// Feeds one change notification into the stream. Returns false if
        /// the stream has been dropped.
        pub async fn push(&self, event: WatchEvent<T>) -> bool {
            self.tx.send(event).await.is_ok()
        }

        /// Ends the stream from this handle.
        pub fn close(self) {}
    }

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> WatchSource<T> for MockSource<T> {
        async fn list(&self) -> InformerResult<Vec<T>> {
            if let Some(message) = &self.list_error {
                return Err(InformerError::Source(message.clone()));
            }
            Ok(self.listing.lock().unwrap_or_else(|e| e.into_inner()).clone())
        }

        async fn watch(&self) -> InformerResult<WatchStream<T>> {
            self.stream
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
                .ok_or_else(|| InformerError::Source("watch stream already taken".to_string()))
        }
    }
}

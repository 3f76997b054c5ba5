//! The reconciler: the controller loop driving source, queue, store, and
//! handler.

use crate::delta_queue::{DeltaQueue, PoppedGroup};
use crate::mutation::MutationDetector;
use crate::{EventHandler, InformerError, InformerResult, WatchSource};
use statemirror_store::IndexedStore;
use statemirror_types::{DeltaKind, WatchObject};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Configuration for an [`Informer`].
#[derive(Debug, Clone)]
pub struct InformerConfig {
    /// How often to re-emit a `Sync` delta for every mirrored object, to
    /// repair drift from missed change notifications. `None` disables
    /// resync.
    pub resync_period: Option<Duration>,
    /// Whether to run the mutation detector. Intended for verification and
    /// test configurations; a no-op in production configurations.
    pub mutation_detection: bool,
    /// How often the mutation detector re-checks observed objects.
    pub mutation_check_period: Duration,
}

impl Default for InformerConfig {
    fn default() -> Self {
        Self {
            resync_period: None,
            mutation_detection: false,
            mutation_check_period: Duration::from_secs(1),
        }
    }
}

/// An optional projection applied to every delta's object before it is
/// monitored, stored, and dispatched. Must preserve object identity.
pub type TransformFn<T> = Arc<dyn Fn(T) -> InformerResult<T> + Send + Sync>;

/// A cloneable handle onto a running informer's cache and sync state.
pub struct InformerHandle<T: WatchObject> {
    queue: Arc<DeltaQueue<T>>,
    store: Arc<IndexedStore<T>>,
}

impl<T: WatchObject> Clone for InformerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: WatchObject> InformerHandle<T> {
    /// Reports whether the initial full listing has been fully drained into
    /// the store.
    pub fn has_synced(&self) -> bool {
        self.queue.has_synced()
    }

    /// The mirrored state.
    pub fn store(&self) -> &Arc<IndexedStore<T>> {
        &self.store
    }
}

/// The reconciliation engine: pulls delta groups off the queue, applies them
/// to the store in order, and notifies the handler of every transition
/// exactly once, in causal order per object.
pub struct Informer<T, S, H>
where
    T: WatchObject,
    S: WatchSource<T>,
    H: EventHandler<T>,
{
    source: S,
    handler: H,
    store: Arc<IndexedStore<T>>,
    queue: Arc<DeltaQueue<T>>,
    detector: Arc<MutationDetector<T>>,
    transform: Option<TransformFn<T>>,
    config: InformerConfig,
}

impl<T, S, H> Informer<T, S, H>
where
    T: WatchObject,
    S: WatchSource<T>,
    H: EventHandler<T>,
{
    /// Creates an informer over the given source, handler, and store.
    pub fn new(source: S, handler: H, store: Arc<IndexedStore<T>>, config: InformerConfig) -> Self {
        let detector = Arc::new(MutationDetector::new(config.mutation_detection));
        Self {
            source,
            handler,
            store,
            queue: Arc::new(DeltaQueue::new()),
            detector,
            transform: None,
            config,
        }
    }

    /// Sets a projection applied to every delta's object before it is
    /// stored. The transform must preserve object identity; changing it is
    /// reported as a [`Transform`](InformerError::Transform) error.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(T) -> InformerResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// The mirrored state.
    pub fn store(&self) -> &Arc<IndexedStore<T>> {
        &self.store
    }

    /// Reports whether the initial full listing has been fully drained into
    /// the store.
    pub fn has_synced(&self) -> bool {
        self.queue.has_synced()
    }

    /// Returns a cloneable handle usable while [`run`](Self::run) owns the
    /// informer.
    pub fn handle(&self) -> InformerHandle<T> {
        InformerHandle {
            queue: Arc::clone(&self.queue),
            store: Arc::clone(&self.store),
        }
    }

    /// Runs the engine until the stop signal is raised (or the sender is
    /// dropped), then completes the in-flight delta group and returns.
    ///
    /// Performs the initial full listing, seeds the queue, then drives three
    /// concurrent loops: the watch pump, the optional resync timer, and the
    /// optional mutation detector, alongside the pop/apply/notify loop on
    /// this task. Groups left unprocessed at shutdown are discarded.
    pub async fn run(self, stop: watch::Receiver<bool>) -> InformerResult<()> {
        info!("informer starting: listing source");
        let listing = self.source.list().await?;
        debug!(count = listing.len(), "initial listing complete");
        self.queue.replace(listing, self.store.snapshot())?;

        let stream = self.source.watch().await?;

        // Fatal conditions from background loops surface through this
        // channel and terminate the run.
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<InformerError>(1);

        let pump = {
            let queue = Arc::clone(&self.queue);
            let fatal_tx = fatal_tx.clone();
            let mut stop = stop.clone();
            tokio::spawn(async move {
                let mut stream = stream;
                let result: InformerResult<()> = loop {
                    tokio::select! {
                        event = stream.next() => match event {
                            Some(event) => {
                                if let Err(e) = queue.enqueue(event.into_delta()) {
                                    break Err(e);
                                }
                            }
                            None => break Err(InformerError::WatchClosed),
                        },
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                break Ok(());
                            }
                        }
                    }
                };
                if let Err(e) = result {
                    warn!(error = %e, "watch pump failed");
                    let _ = fatal_tx.send(e).await;
                }
            })
        };

        let resync = self.config.resync_period.map(|period| {
            let queue = Arc::clone(&self.queue);
            let store = Arc::clone(&self.store);
            let fatal_tx = fatal_tx.clone();
            let mut stop = stop.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                // The first tick fires immediately; the listing already
                // covers it.
                interval.tick().await;
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let objects: Vec<T> =
                                store.snapshot().into_iter().map(|(_, o)| o).collect();
                            debug!(count = objects.len(), "resync");
                            if let Err(e) = queue.resync(objects) {
                                let _ = fatal_tx.send(e).await;
                                return;
                            }
                        }
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                return;
                            }
                        }
                    }
                }
            })
        });

        let checker = self.detector.is_enabled().then(|| {
            let detector = Arc::clone(&self.detector);
            let fatal_tx = fatal_tx.clone();
            let stop = stop.clone();
            let period = self.config.mutation_check_period;
            tokio::spawn(async move {
                if let Err(e) = detector.run(period, stop).await {
                    let _ = fatal_tx.send(e).await;
                }
            })
        });
        drop(fatal_tx);

        let result = self.process_loop(stop, &mut fatal_rx).await;

        self.queue.shut_down();
        pump.abort();
        if let Some(task) = resync {
            task.abort();
        }
        if let Some(task) = checker {
            task.abort();
        }

        match &result {
            Ok(()) => info!("informer stopped"),
            Err(e) => warn!(error = %e, "informer failed"),
        }
        result
    }

    /// The steady-state pop/apply/notify loop. An in-flight group always
    /// completes before a stop is honored; remaining groups are discarded.
    async fn process_loop(
        &self,
        mut stop: watch::Receiver<bool>,
        fatal_rx: &mut mpsc::Receiver<InformerError>,
    ) -> InformerResult<()> {
        loop {
            if *stop.borrow() {
                return Ok(());
            }
            tokio::select! {
                popped = self.queue.pop() => match popped {
                    Some(group) => {
                        let result = self.process_group(&group);
                        self.queue.done(&group.key);
                        result?;
                    }
                    None => return Ok(()),
                },
                fatal = fatal_rx.recv() => match fatal {
                    Some(err) => return Err(err),
                    // Every background loop exited cleanly, which only
                    // happens once the stop signal was raised.
                    None => return Ok(()),
                },
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn process_group(&self, group: &PoppedGroup<T>) -> InformerResult<()> {
        for delta in &group.deltas {
            let object = match &self.transform {
                Some(transform) => {
                    let transformed = transform(delta.object.clone())?;
                    if transformed.key()? != group.key {
                        return Err(InformerError::Transform(format!(
                            "transform changed the identity of {}",
                            group.key
                        )));
                    }
                    transformed
                }
                None => delta.object.clone(),
            };
            self.detector.observe(&object)?;

            match delta.kind {
                DeltaKind::Added | DeltaKind::Updated | DeltaKind::Sync => {
                    if let Some(old) = self.store.get(&group.key) {
                        self.store.update(&object)?;
                        debug!(key = %group.key, kind = ?delta.kind, "applied update");
                        self.handler.on_update(&old, &object);
                    } else {
                        self.store.add(&object)?;
                        debug!(
                            key = %group.key,
                            initial = group.is_in_initial_list,
                            "applied add"
                        );
                        self.handler.on_add(&object, group.is_in_initial_list);
                    }
                }
                DeltaKind::Deleted => {
                    let removed = self.store.delete_by_key(&group.key);
                    debug!(key = %group.key, "applied delete");
                    self.handler.on_delete(removed.as_ref().unwrap_or(&object));
                }
            }
        }
        Ok(())
    }
}

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use statemirror_informer::{InformerError, MutationDetector};
use statemirror_types::WatchObject;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

/// An object whose value lives behind shared interior state, so a careless
/// consumer can mutate a cached copy in place.
#[derive(Debug, Clone)]
struct SharedItem {
    name: String,
    value: Arc<Mutex<i64>>,
}

impl SharedItem {
    fn new(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value: Arc::new(Mutex::new(value)),
        }
    }

    fn set(&self, value: i64) {
        *self.value.lock().unwrap() = value;
    }
}

impl Serialize for SharedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SharedItem", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("value", &*self.value.lock().unwrap())?;
        state.end()
    }
}

impl WatchObject for SharedItem {
    fn scope(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[test]
fn disabled_detector_ignores_mutations() {
    let detector = MutationDetector::new(false);
    let item = SharedItem::new("a", 1);
    detector.observe(&item).unwrap();
    item.set(2);
    assert!(detector.check().is_ok());
}

#[test]
fn untouched_objects_pass_the_check() {
    let detector = MutationDetector::new(true);
    detector.observe(&SharedItem::new("a", 1)).unwrap();
    detector.observe(&SharedItem::new("b", 2)).unwrap();
    assert!(detector.check().is_ok());
}

#[test]
fn reobserving_an_identity_replaces_its_snapshot() {
    let detector = MutationDetector::new(true);
    let item = SharedItem::new("a", 1);
    detector.observe(&item).unwrap();

    // A legitimate new value for the same identity, observed again (as a
    // resync would): only the latest snapshot counts.
    item.set(2);
    detector.observe(&item).unwrap();
    assert!(detector.check().is_ok());
}

#[test]
fn in_place_mutation_is_reported() {
    let detector = MutationDetector::new(true);
    let item = SharedItem::new("a", 1);
    detector.observe(&item).unwrap();
    item.set(2);

    let err = detector.check().unwrap_err();
    match err {
        InformerError::Mutation(m) => assert_eq!(m.key.as_str(), "a"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn check_loop_surfaces_mutation_as_fatal() {
    let detector = Arc::new(MutationDetector::new(true));
    let item = SharedItem::new("a", 1);
    detector.observe(&item).unwrap();

    let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let runner = {
        let detector = Arc::clone(&detector);
        tokio::spawn(async move { detector.run(Duration::from_millis(10), stop_rx).await })
    };

    item.set(2);
    let result = timeout(Duration::from_secs(2), runner)
        .await
        .expect("check loop should terminate on mutation")
        .unwrap();
    assert!(matches!(result, Err(InformerError::Mutation(_))));
}

#[tokio::test]
async fn check_loop_runs_a_final_pass_on_stop() {
    let detector = Arc::new(MutationDetector::new(true));
    let item = SharedItem::new("a", 1);
    detector.observe(&item).unwrap();

    // The period is far in the future, so only the final pass triggered by
    // stop can see the mutation.
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let runner = {
        let detector = Arc::clone(&detector);
        tokio::spawn(async move { detector.run(Duration::from_secs(3600), stop_rx).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    item.set(2);
    stop_tx.send(true).unwrap();

    let result = timeout(Duration::from_secs(2), runner)
        .await
        .expect("check loop should honor stop")
        .unwrap();
    assert!(matches!(result, Err(InformerError::Mutation(_))));
}

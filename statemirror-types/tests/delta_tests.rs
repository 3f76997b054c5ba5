use statemirror_types::{Delta, DeltaKind, WatchEvent};

#[test]
fn constructors_set_kind() {
    assert_eq!(Delta::added(1).kind, DeltaKind::Added);
    assert_eq!(Delta::updated(1).kind, DeltaKind::Updated);
    assert_eq!(Delta::deleted(1).kind, DeltaKind::Deleted);
    assert_eq!(Delta::sync(1).kind, DeltaKind::Sync);
}

#[test]
fn watch_event_object_access() {
    assert_eq!(*WatchEvent::Added(7).object(), 7);
    assert_eq!(*WatchEvent::Updated(8).object(), 8);
    assert_eq!(*WatchEvent::Deleted(9).object(), 9);
}

#[test]
fn watch_event_into_delta_preserves_kind() {
    assert_eq!(WatchEvent::Added(1).into_delta().kind, DeltaKind::Added);
    assert_eq!(WatchEvent::Updated(1).into_delta().kind, DeltaKind::Updated);
    assert_eq!(WatchEvent::Deleted(1).into_delta().kind, DeltaKind::Deleted);
}

#[test]
fn delta_serde_roundtrip() {
    let delta = Delta::updated("payload".to_string());
    let json = serde_json::to_string(&delta).unwrap();
    let back: Delta<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, delta);
}

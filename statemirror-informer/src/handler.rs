//! The sink: caller-supplied callbacks reacting to observed transitions.

/// Callbacks invoked synchronously from the reconciler's task after each
/// store mutation.
///
/// Callbacks are on the critical path of the pop/apply/notify loop, so they
/// must not block indefinitely, and they must treat every object they
/// receive as immutable (enforced probabilistically by the mutation
/// detector when enabled).
pub trait EventHandler<T>: Send + Sync {
    /// An object appeared in the mirror. `is_in_initial_list` distinguishes
    /// "existed before watching started" from "just appeared".
    fn on_add(&self, object: &T, is_in_initial_list: bool);

    /// An object's mirrored value changed. For a periodic resync the old and
    /// new values may be equal.
    fn on_update(&self, old: &T, new: &T);

    /// An object left the mirror. Receives the last stored value.
    fn on_delete(&self, object: &T);
}

/// Closure-based [`EventHandler`] for callers that only care about a subset
/// of transitions. Unset callbacks are no-ops.
#[derive(Default)]
pub struct HandlerFns<T> {
    add: Option<Box<dyn Fn(&T, bool) + Send + Sync>>,
    update: Option<Box<dyn Fn(&T, &T) + Send + Sync>>,
    delete: Option<Box<dyn Fn(&T) + Send + Sync>>,
}

impl<T> HandlerFns<T> {
    /// Creates a handler with no callbacks set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            add: None,
            update: None,
            delete: None,
        }
    }

    /// Sets the add callback.
    #[must_use]
    pub fn on_add(mut self, f: impl Fn(&T, bool) + Send + Sync + 'static) -> Self {
        self.add = Some(Box::new(f));
        self
    }

    /// Sets the update callback.
    #[must_use]
    pub fn on_update(mut self, f: impl Fn(&T, &T) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    /// Sets the delete callback.
    #[must_use]
    pub fn on_delete(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.delete = Some(Box::new(f));
        self
    }
}

impl<T: Send + Sync> EventHandler<T> for HandlerFns<T> {
    fn on_add(&self, object: &T, is_in_initial_list: bool) {
        if let Some(f) = &self.add {
            f(object, is_in_initial_list);
        }
    }

    fn on_update(&self, old: &T, new: &T) {
        if let Some(f) = &self.update {
            f(old, new);
        }
    }

    fn on_delete(&self, object: &T) {
        if let Some(f) = &self.delete {
            f(object);
        }
    }
}

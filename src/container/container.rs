use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use tracing::{error, warn};

use super::shallow::shallow_eq;
use super::state::{ActionFn, State};

type Listener = Arc<dyn Fn(&State, &State) + Send + Sync>;

/// A thread-safe reactive state container.
///
/// Containers own a single [`State`] snapshot and notify subscribers only
/// when a write actually changes it, as decided by the shallow-equality
/// gate. Actions found on the initial state are promoted onto the container
/// at construction and can be invoked directly via [`call`](Container::call).
pub struct Container {
    inner: Arc<ContainerInner>,
    actions: HashMap<String, ActionFn>,
}

struct ContainerInner {
    state: RwLock<Arc<State>>,
    listeners: RwLock<BTreeMap<usize, Listener>>,
    next_listener_id: AtomicUsize,
}

/// Create a container from an initializer.
///
/// The initializer runs synchronously exactly once. It receives a [`Writer`]
/// bound to the new container and returns the initial state; actions on that
/// state typically close over the writer. Every action field present on the
/// initial state is promoted onto the returned container. The promotion set
/// is frozen here: actions introduced by later writes stay reachable only
/// through [`read`](Container::read).
///
/// # Example
///
/// ```
/// use cistern::{create, Field, State};
///
/// let container = create(|writer| {
///     State::new()
///         .set("count", Field::value(0))
///         .set("increment", Field::action(move |_| {
///             writer.update(|state| {
///                 let count = state.value("count").and_then(|v| v.as_i64()).unwrap_or(0);
///                 State::new().set("count", Field::value(count + 1))
///             })
///         }))
/// });
///
/// container.call("increment");
/// assert_eq!(container.read().value("count").and_then(|v| v.as_i64()), Some(1));
/// ```
pub fn create(initializer: impl FnOnce(Writer) -> State) -> Container {
    let inner = Arc::new(ContainerInner {
        state: RwLock::new(Arc::new(State::new())),
        listeners: RwLock::new(BTreeMap::new()),
        next_listener_id: AtomicUsize::new(0),
    });

    let writer = Writer {
        inner: Arc::downgrade(&inner),
    };
    let initial = initializer(writer);

    // The ActionBinder pass: copy every action field onto the handle, once.
    let actions = initial
        .iter()
        .filter_map(|(key, field)| {
            field
                .as_action()
                .map(|action| (key.clone(), Arc::clone(action)))
        })
        .collect();

    *inner.state.write().unwrap() = Arc::new(initial);

    Container { inner, actions }
}

impl Container {
    /// The current state snapshot.
    ///
    /// O(1), no side effects, safe to call from inside a listener or an
    /// action. During a notification this already observes the newly
    /// committed state.
    pub fn read(&self) -> Arc<State> {
        self.inner.read()
    }

    /// Merge `partial` onto the current state.
    ///
    /// An empty `partial` is a no-op. If the merged result is shallow-equal
    /// to the current state, nothing happens and the stored snapshot is not
    /// replaced; otherwise the new state is committed and every listener is
    /// invoked synchronously with `(new, previous)` before this returns.
    pub fn write(&self, partial: State) {
        self.inner.commit(partial, false);
    }

    /// Merge write computed from the current state.
    ///
    /// `f` receives the current snapshot; its return value is treated
    /// exactly like the argument of [`write`](Container::write).
    pub fn update(&self, f: impl FnOnce(&State) -> State) {
        self.inner.update(f, false);
    }

    /// Replace the entire state, discarding all prior fields.
    ///
    /// Empty-candidate and shallow-equality no-op rules apply as in
    /// [`write`](Container::write).
    pub fn replace(&self, next: State) {
        self.inner.commit(next, true);
    }

    /// Replace write computed from the current state.
    pub fn replace_with(&self, f: impl FnOnce(&State) -> State) {
        self.inner.update(f, true);
    }

    /// Register a listener invoked after every committed write.
    ///
    /// Listeners run in subscription order and all observe the same
    /// `(state, previous_state)` pair for one batch. The returned
    /// [`Subscription`] removes the listener via
    /// [`unsubscribe`](Subscription::unsubscribe); dropping it keeps the
    /// listener alive.
    pub fn subscribe(&self, listener: impl Fn(&State, &State) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .write()
            .unwrap()
            .insert(id, Arc::new(listener));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Remove all listeners.
    ///
    /// The container stays usable: state can still be read and written, only
    /// notification stops. Subscribing again afterwards resumes notification
    /// for future writes.
    pub fn dispose(&self) {
        self.inner.listeners.write().unwrap().clear();
    }

    /// A promoted action by name, if the initial state carried one.
    pub fn action(&self, name: &str) -> Option<&ActionFn> {
        self.actions.get(name)
    }

    /// Invoke a promoted action with no arguments.
    ///
    /// Unknown names degrade to a warning instead of panicking, so wiring a
    /// stale action name into an event handler cannot crash the caller.
    pub fn call(&self, name: &str) {
        self.call_with(name, &[]);
    }

    /// Invoke a promoted action with arguments.
    pub fn call_with(&self, name: &str, args: &[Value]) {
        match self.actions.get(name) {
            Some(action) => action(args),
            None => warn!(action = name, "no such promoted action"),
        }
    }

    /// A writer handle bound to this container.
    ///
    /// Writers are cheap to clone and hold only a weak reference, so they
    /// can be moved into async tasks without keeping the container alive.
    pub fn writer(&self) -> Writer {
        Writer {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            actions: self.actions.clone(),
        }
    }
}

/// A write handle that can outlive its container.
///
/// Actions and async tasks hold a `Writer` rather than the container itself.
/// All write methods are no-ops once the container has been dropped.
#[derive(Clone)]
pub struct Writer {
    inner: Weak<ContainerInner>,
}

impl Writer {
    /// See [`Container::read`].
    pub fn read(&self) -> Option<Arc<State>> {
        self.inner.upgrade().map(|inner| inner.read())
    }

    /// See [`Container::write`].
    pub fn write(&self, partial: State) {
        if let Some(inner) = self.inner.upgrade() {
            inner.commit(partial, false);
        }
    }

    /// See [`Container::update`].
    pub fn update(&self, f: impl FnOnce(&State) -> State) {
        if let Some(inner) = self.inner.upgrade() {
            inner.update(f, false);
        }
    }

    /// See [`Container::replace`].
    pub fn replace(&self, next: State) {
        if let Some(inner) = self.inner.upgrade() {
            inner.commit(next, true);
        }
    }

    /// See [`Container::replace_with`].
    pub fn replace_with(&self, f: impl FnOnce(&State) -> State) {
        if let Some(inner) = self.inner.upgrade() {
            inner.update(f, true);
        }
    }
}

/// Handle for removing a registered listener.
pub struct Subscription {
    id: usize,
    inner: Weak<ContainerInner>,
}

impl Subscription {
    /// Remove the listener.
    ///
    /// Idempotent: calling it again, or after [`Container::dispose`], is a
    /// no-op. Listener ids are never reused, so a stale handle can never
    /// remove a listener registered later.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().unwrap().remove(&self.id);
        }
    }
}

impl ContainerInner {
    fn read(&self) -> Arc<State> {
        Arc::clone(&self.state.read().unwrap())
    }

    fn update(&self, f: impl FnOnce(&State) -> State, replace: bool) {
        // The closure runs outside the commit lock so it may call read();
        // concurrent writers serialize at the lock, last committed wins.
        let snapshot = self.read();
        self.commit(f(&snapshot), replace);
    }

    fn commit(&self, candidate: State, replace: bool) {
        if candidate.is_empty() {
            return;
        }
        let (new, previous) = {
            let mut current = self.state.write().unwrap();
            let previous = Arc::clone(&current);
            let next = if replace {
                candidate
            } else {
                let mut merged = (*previous).clone();
                for (key, field) in candidate {
                    merged.insert(key, field);
                }
                merged
            };
            if shallow_eq(&next, &previous) {
                return;
            }
            let new = Arc::new(next);
            *current = Arc::clone(&new);
            (new, previous)
        };
        self.notify(&new, &previous);
    }

    fn notify(&self, new: &State, previous: &State) {
        // Snapshot the registry so listeners may subscribe or unsubscribe
        // mid-batch without deadlocking; the batch itself stays stable.
        let batch: Vec<Listener> = self.listeners.read().unwrap().values().cloned().collect();
        for listener in batch {
            if catch_unwind(AssertUnwindSafe(|| listener(new, previous))).is_err() {
                error!("state listener panicked during notification");
            }
        }
    }
}

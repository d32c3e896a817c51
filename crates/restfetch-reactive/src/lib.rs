//! # restfetch-reactive
//!
//! Reactive value cells for the restfetch client. A [`Reactive<T>`] is a
//! shared value container that notifies registered observers on every
//! mutation and additionally wakes asynchronous waiters, so one task can
//! await another task's state transitions without polling.
//!
//! Cells are handles: cloning a `Reactive` clones the handle, not the
//! value, and every handle observes the same underlying state. A cell is
//! owned by the controller that creates it and is dropped with it; there
//! is no global registry.
//!
//! ## Usage
//!
//! ```
//! use restfetch_reactive::Reactive;
//! use std::sync::Arc;
//!
//! let cell = Reactive::new(0_u64);
//!
//! cell.subscribe("printer", Arc::new(|value: &u64| {
//!     println!("value is now {value}");
//! }));
//!
//! cell.set(42);
//! assert_eq!(cell.get(), 42);
//! ```

use std::sync::{Arc, RwLock};

use tokio::sync::Notify;

/// The type signature for an observer callback.
///
/// Observers receive a reference to the new value after each mutation and
/// must be `Send + Sync` so cells can be shared across tasks.
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: RwLock<T>,
    observers: RwLock<Vec<(String, Observer<T>)>>,
    changed: Notify,
}

/// A shared, observable value cell.
///
/// Observers are called in subscription order. Subscribing with an id that
/// is already registered replaces the previous observer.
///
/// # Examples
///
/// ```
/// use restfetch_reactive::Reactive;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let cell = Reactive::new(String::new());
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = seen.clone();
///
/// cell.subscribe("counter", Arc::new(move |_: &String| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// cell.set("hello".to_string());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct Reactive<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone> Default for Reactive<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Reactive<T> {
    /// Creates a new cell holding the given value, with no observers.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                observers: RwLock::new(Vec::new()),
                changed: Notify::new(),
            }),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().expect("cell lock poisoned").clone()
    }

    /// Replaces the value, then notifies observers and async waiters.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write().expect("cell lock poisoned");
            *guard = value;
        }
        self.notify();
    }

    /// Mutates the value in place, then notifies observers and async
    /// waiters.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut guard = self.inner.value.write().expect("cell lock poisoned");
            f(&mut guard);
        }
        self.notify();
    }

    /// Connects an observer to this cell.
    ///
    /// The `observer_id` identifies the observer for later removal. If an
    /// observer with the same id is already connected, it is replaced.
    pub fn subscribe(&self, observer_id: impl Into<String>, callback: Observer<T>) {
        let id = observer_id.into();
        let mut observers = self.inner.observers.write().expect("cell lock poisoned");

        if let Some(entry) = observers.iter_mut().find(|(oid, _)| *oid == id) {
            entry.1 = callback;
        } else {
            observers.push((id, callback));
        }
    }

    /// Disconnects the observer with the given id.
    ///
    /// Returns `true` if an observer was found and removed.
    pub fn unsubscribe(&self, observer_id: &str) -> bool {
        let mut observers = self.inner.observers.write().expect("cell lock poisoned");
        let len_before = observers.len();
        observers.retain(|(id, _)| id != observer_id);
        observers.len() < len_before
    }

    /// Returns the number of connected observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().expect("cell lock poisoned").len()
    }

    /// Waits until the next mutation of this cell.
    ///
    /// Only mutations that happen after this call wakes the waiter; use
    /// [`wait_until`](Self::wait_until) when the condition may already
    /// hold.
    pub async fn changed(&self) {
        self.inner.changed.notified().await;
    }

    /// Waits until the predicate holds for the cell's value.
    ///
    /// The predicate is checked immediately and then after every mutation.
    /// The wait is race-free: a mutation arriving between the check and the
    /// sleep still wakes the waiter.
    pub async fn wait_until<F>(&self, mut pred: F)
    where
        F: FnMut(&T) -> bool,
    {
        loop {
            let notified = self.inner.changed.notified();
            let current = self.get();
            if pred(&current) {
                return;
            }
            notified.await;
        }
    }

    fn notify(&self) {
        let current = self.get();
        {
            let observers = self.inner.observers.read().expect("cell lock poisoned");
            for (_, callback) in observers.iter() {
                callback(&current);
            }
        }
        self.inner.changed.notify_waiters();
    }
}

/// A per-call input that is either a static value or a reactive cell.
///
/// Call sites hold `Source`s for configuration that may change between
/// executions (body, headers); [`resolve`](Source::resolve) re-reads the
/// cell on every execution.
///
/// # Examples
///
/// ```
/// use restfetch_reactive::{Reactive, Source};
///
/// let fixed: Source<u64> = Source::from(7);
/// assert_eq!(fixed.resolve(), 7);
///
/// let cell = Reactive::new(1_u64);
/// let live: Source<u64> = Source::from(cell.clone());
/// cell.set(2);
/// assert_eq!(live.resolve(), 2);
/// ```
pub enum Source<T> {
    /// A fixed value, resolved once.
    Value(T),
    /// A reactive cell, re-read on every resolution.
    Cell(Reactive<T>),
}

impl<T: Clone> Source<T> {
    /// Returns the current value of this source.
    pub fn resolve(&self) -> T {
        match self {
            Self::Value(value) => value.clone(),
            Self::Cell(cell) => cell.get(),
        }
    }
}

impl<T: Clone> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Cell(cell) => Self::Cell(cell.clone()),
        }
    }
}

impl<T: Default> Default for Source<T> {
    fn default() -> Self {
        Self::Value(T::default())
    }
}

impl<T> From<T> for Source<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T> From<Reactive<T>> for Source<T> {
    fn from(cell: Reactive<T>) -> Self {
        Self::Cell(cell)
    }
}

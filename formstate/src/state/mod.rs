//! Reactive substrate: observable cells, derived values and batching.

mod batch;
mod computed;
mod signal;

pub use batch::{batch, in_batch};
pub use computed::Computed;
pub use signal::{Listener, ListenerId, Signal, Subscription};

use std::sync::{Arc, RwLock};

/// Observable cell with interior mutability.
///
/// `State<T>` uses `Arc<RwLock<T>>` internally, making it cheap to clone and
/// safe to hold across async task boundaries. Every write notifies the cell's
/// [`Signal`]; cells created with [`State::with_signal`] share a signal with
/// their owner.
///
/// # Example
///
/// ```
/// use formstate::state::State;
///
/// let count = State::new(1);
/// count.update(|v| *v += 1);
/// assert_eq!(count.get(), 2);
/// ```
#[derive(Debug)]
pub struct State<T> {
    inner: Arc<RwLock<T>>,
    signal: Signal,
}

impl<T> State<T> {
    /// Create a new state with its own signal
    pub fn new(value: T) -> Self {
        Self::with_signal(value, Signal::new())
    }

    /// Create a new state that notifies `signal` on writes
    pub fn with_signal(value: T, signal: Signal) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
            signal,
        }
    }

    /// Get a clone of the current value
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Set a new value
    pub fn set(&self, value: T) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = value;
        } else {
            return;
        }
        self.mark_changed();
    }

    /// Set a new value, skipping the notification when nothing changed.
    ///
    /// Returns whether the value changed.
    pub fn replace_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let changed = match self.inner.write() {
            Ok(mut guard) if *guard != value => {
                *guard = value;
                true
            }
            _ => false,
        };
        if changed {
            self.mark_changed();
        }
        changed
    }

    /// Update the value using a closure
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        if let Ok(mut guard) = self.inner.write() {
            f(&mut guard);
        } else {
            return;
        }
        self.mark_changed();
    }

    /// The signal this cell notifies
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Subscribe to writes of this cell (and of any cell sharing its signal)
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.signal.subscribe(listener)
    }

    // The write guard is released before listeners run.
    fn mark_changed(&self) {
        self.signal.notify();
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            signal: self.signal.clone(),
        }
    }
}

impl<T: Default> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_set_notifies() {
        let state = State::new(String::from("a"));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = state.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        state.set("b".into());
        assert_eq!(state.get(), "b");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replace_if_changed_skips_equal_value() {
        let state = State::new(3);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = state.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!state.replace_if_changed(3));
        assert!(state.replace_if_changed(4));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_signal() {
        let signal = Signal::new();
        let a = State::with_signal(1, signal.clone());
        let b = State::with_signal(false, signal.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = signal.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        a.set(2);
        b.set(true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}

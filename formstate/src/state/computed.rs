//! Derived values.

use super::{Signal, State, Subscription};

/// A value derived from other cells.
///
/// The derivation re-runs synchronously every time the source signal fires.
/// Its own signal fires only when the derived value actually changed, so
/// chained consumers don't see spurious updates.
///
/// # Example
///
/// ```
/// use formstate::state::{Computed, State};
///
/// let price = State::new(10);
/// let source = price.clone();
/// let doubled = Computed::new(price.signal(), move || source.get() * 2);
///
/// price.set(21);
/// assert_eq!(doubled.get(), 42);
/// ```
#[derive(Debug)]
pub struct Computed<T> {
    value: State<T>,
    _source: Subscription,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Derive a value from `f`, recomputing when `source` fires
    pub fn new<F>(source: &Signal, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let value = State::new(f());
        let cell = value.clone();
        let subscription = source.subscribe(move || {
            cell.replace_if_changed(f());
        });

        Self {
            value,
            _source: subscription,
        }
    }

    /// Current derived value
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Signal fired when the derived value changes
    pub fn signal(&self) -> &Signal {
        self.value.signal()
    }

    /// Subscribe to changes of the derived value
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.value.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::batch;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_recomputes_on_change() {
        let name = State::new(String::new());
        let source = name.clone();
        let empty = Computed::new(name.signal(), move || source.get().is_empty());
        assert!(empty.get());

        name.set("x".into());
        assert!(!empty.get());
    }

    #[test]
    fn test_only_notifies_on_real_change() {
        let n = State::new(1);
        let source = n.clone();
        let parity = Computed::new(n.signal(), move || source.get() % 2);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = parity.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        n.set(3);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        n.set(4);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batched_sources_recompute_once() {
        let signal = Signal::new();
        let a = State::with_signal(1, signal.clone());
        let b = State::with_signal(2, signal.clone());
        let runs = Arc::new(AtomicUsize::new(0));
        let (sa, sb, counter) = (a.clone(), b.clone(), Arc::clone(&runs));
        let sum = Computed::new(&signal, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            sa.get() + sb.get()
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        batch(|| {
            a.set(10);
            b.set(20);
        });
        assert_eq!(sum.get(), 30);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}

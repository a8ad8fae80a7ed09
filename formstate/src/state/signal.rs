//! Change notification channel shared by reactive cells.
//!
//! A [`Signal`] is the push side of the reactive substrate. Every cell that
//! belongs to the same owner (for example all cells of one field) shares one
//! signal, so a consumer subscribes once and hears about any change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::batch;

/// Callback invoked when a signal fires.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Default)]
pub(crate) struct SignalInner {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
}

/// Cheap-to-clone change notifier.
///
/// Clones share the same listener list.
#[derive(Clone, Default)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

impl Signal {
    /// Create a signal without listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.register(Arc::new(listener));
        Subscription {
            signal: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Forward every notification of this signal to `target` until the
    /// returned [`Subscription`] is dropped.
    #[must_use = "dropping the subscription removes the link"]
    pub fn forward_to(&self, target: &Signal) -> Subscription {
        let target = target.clone();
        self.subscribe(move || target.notify())
    }

    /// Notify listeners, or queue the notification if a batch is open.
    pub fn notify(&self) {
        if batch::defer(self) {
            return;
        }
        self.fire();
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }

    pub(crate) fn fire(&self) {
        // Listeners may subscribe or notify re-entrantly, so call them
        // outside the lock.
        let listeners: Vec<Listener> = match self.inner.listeners.lock() {
            Ok(guard) => guard.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect(),
        };
        for listener in listeners {
            listener();
        }
    }

    pub(crate) fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn register(&self, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        if let Ok(mut guard) = self.inner.listeners.lock() {
            guard.push((id, listener));
        }
        id
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Guard returned by [`Signal::subscribe`]; unregisters on drop.
#[derive(Debug)]
pub struct Subscription {
    signal: Weak<SignalInner>,
    id: ListenerId,
}

impl Subscription {
    /// Identifier of the registered listener
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.signal.upgrade()
            && let Ok(mut guard) = inner.listeners.lock()
        {
            guard.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscription_drop_unregisters() {
        let signal = Signal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = signal.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(sub);
        signal.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_forward_to() {
        let child = Signal::new();
        let parent = Signal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = parent.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let link = child.forward_to(&parent);
        child.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(link);
        child.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

//! Listener registry backing reactive collection reads.
//!
//! # Responsibility
//! - Hold collection listeners registered by UI-facing callers.
//! - Hand out subscription handles that unregister on drop.
//!
//! # Invariants
//! - Listeners are invoked outside the registry lock, so a listener may
//!   drop its own subscription while being notified.
//! - A dropped subscription is never invoked again.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked with the full current ordered collection.
pub type Listener<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

type ListenerMap<T> = Mutex<BTreeMap<u64, Listener<T>>>;

pub struct ListenerRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

struct RegistryInner<T> {
    next_id: Mutex<u64>,
    listeners: ListenerMap<T>,
}

impl<T: 'static> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: Mutex::new(1),
                listeners: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Registers `listener` and returns the handle that owns its lifetime.
    pub fn register(&self, listener: Listener<T>) -> Subscription {
        let id = {
            let mut next = lock(&self.inner.next_id);
            let id = *next;
            *next += 1;
            id
        };
        lock(&self.inner.listeners).insert(id, listener);

        let weak: Weak<RegistryInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            release: Some(Box::new(move |id| {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner.listeners).remove(&id);
                }
            })),
        }
    }

    /// Invokes every live listener with `items`.
    pub fn emit(&self, items: &[T]) {
        let snapshot: Vec<Listener<T>> = lock(&self.inner.listeners).values().cloned().collect();
        for listener in snapshot {
            listener(items);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Live registration handle. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    release: Option<Box<dyn FnOnce(u64) + Send>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unsubscribes explicitly; equivalent to dropping the handle.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

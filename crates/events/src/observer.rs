//! In-process observer registry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};

use warden_core::ObserverToken;

use crate::subscription::Subscription;

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

enum Observer<M> {
    Callback(Callback<M>),
    Channel(mpsc::Sender<M>),
}

impl<M> Clone for Observer<M> {
    fn clone(&self) -> Self {
        match self {
            Observer::Callback(f) => Observer::Callback(Arc::clone(f)),
            Observer::Channel(tx) => Observer::Channel(tx.clone()),
        }
    }
}

/// Ordered observer registry.
///
/// - No IO / no async
/// - Observers are notified synchronously, in registration order
/// - The registry lock is never held while an observer runs, so observers may
///   register or unregister from inside a notification; such changes apply
///   from the next notification on
pub struct ObserverRegistry<M> {
    observers: Mutex<Vec<(ObserverToken, Observer<M>)>>,
}

impl<M> ObserverRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded Vec is never left half-updated, so a poisoned lock still
    // holds a consistent list.
    fn lock(&self) -> MutexGuard<'_, Vec<(ObserverToken, Observer<M>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback; it runs on the notifying thread.
    pub fn register<F>(&self, callback: F) -> ObserverToken
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let token = ObserverToken::new();
        self.lock().push((token, Observer::Callback(Arc::new(callback))));
        token
    }

    /// Remove an observer. Unknown tokens are a no-op and return `false`.
    pub fn unregister(&self, token: ObserverToken) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(t, _)| *t != token);
        observers.len() != before
    }

    /// Release every observer (session end). Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut observers = self.lock();
        let released = observers.len();
        observers.clear();
        released
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<M> ObserverRegistry<M>
where
    M: Clone + Send + 'static,
{
    /// Register a channel observer for consumers on another thread.
    pub fn subscribe_channel(&self) -> (ObserverToken, Subscription<M>) {
        let (tx, rx) = mpsc::channel();
        let token = ObserverToken::new();
        self.lock().push((token, Observer::Channel(tx)));
        (token, Subscription::new(rx))
    }

    /// Deliver `message` to every observer registered at call time.
    ///
    /// Returns the number of observers reached. Channel observers whose
    /// receiver is gone are dropped along the way.
    pub fn notify(&self, message: &M) -> usize {
        let snapshot: Vec<(ObserverToken, Observer<M>)> = self.lock().clone();

        let mut delivered = 0;
        let mut dead = Vec::new();

        for (token, observer) in &snapshot {
            match observer {
                Observer::Callback(f) => {
                    f(message);
                    delivered += 1;
                }
                Observer::Channel(tx) => {
                    if tx.send(message.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        dead.push(*token);
                    }
                }
            }
        }

        if !dead.is_empty() {
            tracing::debug!(count = dead.len(), "dropping disconnected channel observers");
            self.lock().retain(|(t, _)| !dead.contains(t));
        }

        delivered
    }
}

impl<M> Default for ObserverRegistry<M> {
    fn default() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> core::fmt::Debug for ObserverRegistry<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn notifies_in_registration_order() {
        let registry: ObserverRegistry<u32> = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = log.clone();
            registry.register(move |m: &u32| log.lock().unwrap().push((name, *m)));
        }

        assert_eq!(registry.notify(&7), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn unregister_unknown_token_is_noop() {
        let registry: ObserverRegistry<u32> = ObserverRegistry::new();
        registry.register(|_| {});

        assert!(!registry.unregister(ObserverToken::new()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregistered_observer_is_not_called() {
        let registry: ObserverRegistry<u32> = ObserverRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let token = registry.register(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&1);
        assert!(registry.unregister(token));
        registry.notify(&2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_may_unregister_itself_during_notification() {
        let registry: Arc<ObserverRegistry<u32>> = Arc::new(ObserverRegistry::new());
        let token_slot: Arc<Mutex<Option<ObserverToken>>> = Arc::new(Mutex::new(None));

        let reg = Arc::downgrade(&registry);
        let slot = token_slot.clone();
        let token = registry.register(move |_| {
            if let (Some(reg), Some(token)) = (reg.upgrade(), *slot.lock().unwrap()) {
                reg.unregister(token);
            }
        });
        *token_slot.lock().unwrap() = Some(token);

        assert_eq!(registry.notify(&1), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn channel_observer_receives_messages_and_is_pruned_when_dropped() {
        let registry: ObserverRegistry<u32> = ObserverRegistry::new();
        let (_token, sub) = registry.subscribe_channel();

        registry.notify(&1);
        registry.notify(&2);
        assert_eq!(sub.drain(), vec![1, 2]);

        drop(sub);
        assert_eq!(registry.notify(&3), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let registry: ObserverRegistry<u32> = ObserverRegistry::new();
        registry.register(|_| {});
        let (_t, sub) = registry.subscribe_channel();

        assert_eq!(registry.clear(), 2);
        assert!(sub.recv().is_err());
    }
}

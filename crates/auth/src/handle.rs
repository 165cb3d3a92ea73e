//! Read/write handle over the auth store for arbitrary call sites.
//!
//! The handle is the framework-agnostic equivalent of a "use permissions"
//! hook: read the current map, request a partial update, or register for
//! push notifications. It is passed explicitly (or through whatever scoped
//! context the host UI offers); there is no global store.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use warden_core::{ObserverToken, PermissionMap, RequiredPermissions};
use warden_events::Subscription;

use crate::evaluate::{AccessDecision, evaluate};
use crate::store::{AuthStore, StoreError};

#[derive(Debug, Clone)]
pub struct AuthHandle {
    store: Arc<AuthStore>,
}

impl AuthHandle {
    pub fn new(store: Arc<AuthStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    /// Current map; the same `Arc` until the next update.
    pub fn read(&self) -> Arc<PermissionMap> {
        self.store.get()
    }

    /// Shallow-merge `partial` into the current map and notify observers.
    pub fn write(&self, partial: PermissionMap) -> Result<Arc<PermissionMap>, StoreError> {
        self.store.merge(partial)
    }

    pub fn check(&self, required: &RequiredPermissions) -> AccessDecision {
        evaluate(required, &self.read())
    }

    /// Call `on_change` with every new map until the returned [`Watch`] drops.
    pub fn watch<F>(&self, on_change: F) -> Watch
    where
        F: Fn(&Arc<PermissionMap>) + Send + Sync + 'static,
    {
        let token = self.store.subscribe(on_change);
        Watch::new(&self.store, token)
    }

    /// Re-evaluate `required` on every update and call `on_change` only when
    /// the outcome flips. Returns the decision at registration time.
    pub fn watch_access<F>(&self, required: RequiredPermissions, on_change: F) -> (Watch, AccessDecision)
    where
        F: Fn(&AccessDecision) + Send + Sync + 'static,
    {
        self.register_access(required, on_change, false)
    }

    /// Like [`AuthHandle::watch_access`], but `on_change` also receives the
    /// decision at registration time. That first call happens before any
    /// concurrent commit is fanned out, so the last call always reflects the
    /// latest map.
    pub fn follow_access<F>(&self, required: RequiredPermissions, on_change: F) -> Watch
    where
        F: Fn(&AccessDecision) + Send + Sync + 'static,
    {
        self.register_access(required, on_change, true).0
    }

    fn register_access<F>(
        &self,
        required: RequiredPermissions,
        on_change: F,
        emit_initial: bool,
    ) -> (Watch, AccessDecision)
    where
        F: Fn(&AccessDecision) + Send + Sync + 'static,
    {
        let probe = required.clone();
        let (token, current) = self.store.subscribe_with(move |current| {
            let initial = evaluate(&required, current);
            if emit_initial {
                on_change(&initial);
            }
            let last = Mutex::new(initial.is_granted());

            move |map: &Arc<PermissionMap>| {
                let decision = evaluate(&required, map);
                let changed = {
                    let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
                    let changed = *last != decision.is_granted();
                    *last = decision.is_granted();
                    changed
                };
                if changed {
                    on_change(&decision);
                }
            }
        });

        let initial = evaluate(&probe, &current);
        (Watch::new(&self.store, token), initial)
    }

    /// Deliver updates over a channel, for consumers on another thread.
    pub fn channel(&self) -> (Watch, Subscription<Arc<PermissionMap>>) {
        let (token, subscription) = self.store.subscribe_channel();
        (Watch::new(&self.store, token), subscription)
    }
}

impl From<Arc<AuthStore>> for AuthHandle {
    fn from(store: Arc<AuthStore>) -> Self {
        Self::new(store)
    }
}

/// Live observer registration; unsubscribes when dropped.
#[derive(Debug)]
#[must_use = "dropping a Watch unsubscribes immediately"]
pub struct Watch {
    store: Option<Weak<AuthStore>>,
    token: ObserverToken,
}

impl Watch {
    fn new(store: &Arc<AuthStore>, token: ObserverToken) -> Self {
        Self {
            store: Some(Arc::downgrade(store)),
            token,
        }
    }

    pub fn token(&self) -> ObserverToken {
        self.token
    }

    /// Keep the observer registered for the rest of the session and hand back
    /// its token for a manual `unsubscribe`.
    pub fn detach(mut self) -> ObserverToken {
        self.store = None;
        self.token
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        if let Some(store) = self.store.take().and_then(|s| s.upgrade()) {
            store.unsubscribe(self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle() -> AuthHandle {
        AuthHandle::new(AuthStore::shared())
    }

    #[test]
    fn write_then_read_observes_merge() {
        let h = handle();
        h.store()
            .initialize(PermissionMap::from([("starRepo", true), ("followRepo", true)]))
            .unwrap();

        h.write(PermissionMap::from([("starRepo", false)])).unwrap();

        let current = h.read();
        assert_eq!(current.get("starRepo"), Some(false));
        assert_eq!(current.get("followRepo"), Some(true));
    }

    #[test]
    fn each_watcher_sees_merged_map_exactly_once() {
        let h = handle();
        h.store()
            .initialize(PermissionMap::from([("starRepo", true), ("followRepo", true)]))
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let watches: Vec<Watch> = (0..2)
            .map(|_| {
                let calls = calls.clone();
                h.watch(move |m| calls.lock().unwrap().push((**m).clone()))
            })
            .collect();

        h.write(PermissionMap::from([("starRepo", false)])).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        for m in calls.iter() {
            assert_eq!(*m, PermissionMap::from([("starRepo", false), ("followRepo", true)]));
        }
        drop(watches);
    }

    #[test]
    fn read_is_referentially_stable_until_write() {
        let h = handle();
        let before = h.read();
        assert!(Arc::ptr_eq(&before, &h.read()));

        h.write(PermissionMap::from([("admin", true)])).unwrap();
        assert!(!Arc::ptr_eq(&before, &h.read()));
    }

    #[test]
    fn dropping_watch_unsubscribes() {
        let h = handle();
        let hits = Arc::new(AtomicUsize::new(0));

        let hh = hits.clone();
        let watch = h.watch(move |_| {
            hh.fetch_add(1, Ordering::SeqCst);
        });
        h.write(PermissionMap::from([("a", true)])).unwrap();
        drop(watch);
        h.write(PermissionMap::from([("a", false)])).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(h.store().observer_count(), 0);
    }

    #[test]
    fn detached_watch_stays_registered() {
        let h = handle();
        let token = h.watch(|_| {}).detach();

        assert_eq!(h.store().observer_count(), 1);
        assert!(h.store().unsubscribe(token));
    }

    #[test]
    fn watch_access_fires_only_on_outcome_change() {
        let h = handle();
        let flips = Arc::new(Mutex::new(Vec::new()));

        let f = flips.clone();
        let (_watch, initial) = h.watch_access(RequiredPermissions::from(["admin"]), move |d| {
            f.lock().unwrap().push(d.is_granted());
        });
        assert!(!initial.is_granted());

        h.write(PermissionMap::from([("unrelated", true)])).unwrap();
        h.write(PermissionMap::from([("admin", true)])).unwrap();
        h.write(PermissionMap::from([("other", true)])).unwrap();
        h.write(PermissionMap::from([("admin", false)])).unwrap();

        assert_eq!(*flips.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn follow_access_reports_initial_decision_then_flips() {
        let h = handle();
        h.write(PermissionMap::from([("admin", true)])).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        let _watch = h.follow_access(RequiredPermissions::from(["admin"]), move |d| {
            s.lock().unwrap().push(d.is_granted());
        });
        h.write(PermissionMap::from([("theme", true)])).unwrap();
        h.write(PermissionMap::from([("admin", false)])).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn writing_from_initial_callback_is_rejected() {
        let h = handle();
        let results = Arc::new(Mutex::new(Vec::new()));

        let (inner, r) = (h.clone(), results.clone());
        let _watch = h.follow_access(RequiredPermissions::from(["admin"]), move |_| {
            r.lock().unwrap().push(inner.write(PermissionMap::from([("admin", true)])));
        });

        assert_eq!(*results.lock().unwrap(), vec![Err(StoreError::ReentrantUpdate)]);
        assert!(h.read().is_empty());
    }

    #[test]
    fn channel_receives_updates() {
        let h = handle();
        let (_watch, sub) = h.channel();

        h.write(PermissionMap::from([("admin", true)])).unwrap();

        let map = sub.try_recv().unwrap();
        assert_eq!(map.get("admin"), Some(true));
    }

    #[test]
    fn check_is_fail_closed_before_initialization() {
        let h = handle();
        assert!(!h.check(&RequiredPermissions::from(["admin"])).is_granted());
        assert!(h.check(&RequiredPermissions::none()).is_granted());
    }
}

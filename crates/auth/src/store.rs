//! The auth store: sole owner of the current permission map.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use warden_core::{ObserverToken, PermissionMap};
use warden_events::{ObserverRegistry, Subscription};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("auth store is already initialized")]
    AlreadyInitialized,

    /// An observer tried to update the store it is being notified by.
    #[error("auth store cannot be updated from inside one of its own notifications")]
    ReentrantUpdate,
}

thread_local! {
    // Stores currently fanning out a notification on this thread.
    static NOTIFYING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a store as notifying on the current thread until dropped.
struct NotifyingGuard(usize);

impl NotifyingGuard {
    fn enter(id: usize) -> Self {
        NOTIFYING.with(|n| n.borrow_mut().push(id));
        Self(id)
    }
}

impl Drop for NotifyingGuard {
    fn drop(&mut self) {
        NOTIFYING.with(|n| {
            let mut n = n.borrow_mut();
            if let Some(pos) = n.iter().rposition(|id| *id == self.0) {
                n.remove(pos);
            }
        });
    }
}

#[derive(Debug)]
struct State {
    map: Arc<PermissionMap>,
    revision: u64,
    initialized_at: Option<DateTime<Utc>>,
}

/// Holds the current [`PermissionMap`] and the observers interested in it.
///
/// - `get` never waits on a notification in progress
/// - `initialize` and `merge` are the only mutators; both swap the map and
///   notify observers (registration order) before returning
/// - commits are serialized by one exclusive lock, so the store may be shared
///   across threads with the same atomicity as a single UI thread
#[derive(Debug)]
pub struct AuthStore {
    state: RwLock<State>,
    commit: Mutex<()>,
    observers: ObserverRegistry<Arc<PermissionMap>>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self {
            state: RwLock::new(State {
                map: Arc::new(PermissionMap::new()),
                revision: 0,
                initialized_at: None,
            }),
            commit: Mutex::new(()),
            observers: ObserverRegistry::new(),
        }
    }
}

impl AuthStore {
    /// Empty, uninitialized store (every restricted resource is denied).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    fn is_notifying(&self) -> bool {
        let id = self.id();
        NOTIFYING.with(|n| n.borrow().contains(&id))
    }

    // A panicking observer poisons `commit`, but `()` carries no state and the
    // map was already swapped, so later commits proceed normally.
    fn commit_lock(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Current map. Before initialization this is the empty map.
    ///
    /// The same `Arc` is returned until the next commit, so `Arc::ptr_eq`
    /// is a valid "nothing changed" check.
    pub fn get(&self) -> Arc<PermissionMap> {
        self.read_state(|s| Arc::clone(&s.map))
    }

    /// Bumped on every replacement of the current map.
    pub fn revision(&self) -> u64 {
        self.read_state(|s| s.revision)
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state(|s| s.initialized_at.is_some())
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        self.read_state(|s| s.initialized_at)
    }

    /// Seed the store. Allowed exactly once; a second call is rejected and
    /// leaves the current map untouched.
    pub fn initialize(&self, map: PermissionMap) -> Result<Arc<PermissionMap>, StoreError> {
        if self.is_notifying() {
            return Err(StoreError::ReentrantUpdate);
        }
        let _commit = self.commit_lock();

        if self.is_initialized() {
            tracing::warn!("rejected second initialization of auth store");
            return Err(StoreError::AlreadyInitialized);
        }

        let keys = map.len();
        let map = self.commit(|_| map, Some(Utc::now()));
        tracing::info!(keys, "auth store initialized");
        Ok(map)
    }

    /// Replace the current map with `current ⊕ partial` and notify observers.
    pub fn merge(&self, partial: PermissionMap) -> Result<Arc<PermissionMap>, StoreError> {
        if self.is_notifying() {
            return Err(StoreError::ReentrantUpdate);
        }
        let _commit = self.commit_lock();

        let keys = partial.len();
        let map = self.commit(|current| current.merge(&partial), None);
        tracing::debug!(keys, total = map.len(), "merged permission update");
        Ok(map)
    }

    /// Swap in the next map and fan it out. Caller holds the commit lock.
    fn commit(
        &self,
        next: impl FnOnce(&PermissionMap) -> PermissionMap,
        initialized_at: Option<DateTime<Utc>>,
    ) -> Arc<PermissionMap> {
        let map = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let map = Arc::new(next(state.map.as_ref()));
            state.map = Arc::clone(&map);
            state.revision += 1;
            if initialized_at.is_some() {
                state.initialized_at = initialized_at;
            }
            map
        };

        let _notifying = NotifyingGuard::enter(self.id());
        let notified = self.observers.notify(&map);
        tracing::trace!(notified, "permission map observers notified");

        map
    }

    /// Register an observer; it receives every future map, in order.
    pub fn subscribe<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&Arc<PermissionMap>) + Send + Sync + 'static,
    {
        self.observers.register(observer)
    }

    /// Register an observer built from the current map, with no commit able
    /// to slip in between reading that map and registering.
    ///
    /// `build` runs under the commit lock: anything it delivers reaches
    /// consumers before the next commit's notification. Updating the store
    /// from `build` fails with [`StoreError::ReentrantUpdate`].
    pub fn subscribe_with<B, F>(&self, build: B) -> (ObserverToken, Arc<PermissionMap>)
    where
        B: FnOnce(&Arc<PermissionMap>) -> F,
        F: Fn(&Arc<PermissionMap>) + Send + Sync + 'static,
    {
        // Inside a notification this thread already holds the commit lock.
        let _commit = if self.is_notifying() {
            None
        } else {
            Some(self.commit_lock())
        };

        let current = self.get();
        let observer = {
            let _notifying = NotifyingGuard::enter(self.id());
            build(&current)
        };
        let token = self.observers.register(observer);
        (token, current)
    }

    /// Channel-backed subscription for consumers on another thread.
    pub fn subscribe_channel(&self) -> (ObserverToken, Subscription<Arc<PermissionMap>>) {
        self.observers.subscribe_channel()
    }

    /// Unknown tokens are a no-op and return `false`.
    pub fn unsubscribe(&self, token: ObserverToken) -> bool {
        self.observers.unregister(token)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Session end: release every observer. The map itself stays readable.
    pub fn close(&self) -> usize {
        let released = self.observers.clear();
        tracing::debug!(released, "auth store closed");
        released
    }
}

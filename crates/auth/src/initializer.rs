//! Startup seeding of the auth store from a host-supplied loader.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::payload::{InitialData, InitialDataError};
use crate::store::{AuthStore, StoreError};

/// Source of the initial data (HTTP bootstrap call, local file, test stub).
///
/// The payload must be shaped `{ "auth": { "<key>": <bool> } }`; it is
/// validated by the [`Initializer`], not by the loader.
#[async_trait]
pub trait InitialDataLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The store now holds the loaded map.
    Seeded { keys: usize },

    /// The loader itself failed; the store stays empty.
    LoaderFailed(String),

    /// The loader returned a payload of the wrong shape; the store stays empty.
    Malformed(InitialDataError),

    /// Someone else initialized the store first; its state was kept.
    AlreadyInitialized,

    /// This initializer already ran; the loader was not called again.
    AlreadyRan,

    /// The store refused the seed for another reason (e.g. the run was driven
    /// from inside one of the store's own notifications).
    Rejected(StoreError),
}

/// Result of one initialization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub outcome: InitOutcome,
    pub finished_at: DateTime<Utc>,
}

impl InitReport {
    fn new(outcome: InitOutcome) -> Self {
        Self {
            outcome,
            finished_at: Utc::now(),
        }
    }

    pub fn is_seeded(&self) -> bool {
        matches!(self.outcome, InitOutcome::Seeded { .. })
    }
}

/// Runs the bootstrap loader once and seeds the store with its result.
///
/// Failures never escape: they are logged and reported, and the store is left
/// empty so every restricted resource is denied.
#[derive(Debug)]
pub struct Initializer {
    store: Arc<AuthStore>,
    started: AtomicBool,
}

impl Initializer {
    pub fn new(store: Arc<AuthStore>) -> Self {
        Self {
            store,
            started: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    pub async fn run<L>(&self, loader: &L) -> InitReport
    where
        L: InitialDataLoader + ?Sized,
    {
        self.run_with(|| loader.load()).await
    }

    /// Same as [`Initializer::run`] for a plain async closure.
    pub async fn run_with<F, Fut>(&self, load: F) -> InitReport
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("initializer invoked more than once; ignoring");
            return InitReport::new(InitOutcome::AlreadyRan);
        }

        let value = match load().await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "initial data loader failed; permissions stay empty");
                return InitReport::new(InitOutcome::LoaderFailed(format!("{err:#}")));
            }
        };

        let data = match InitialData::from_value(&value) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(error = %err, "malformed initial data; permissions stay empty");
                return InitReport::new(InitOutcome::Malformed(err));
            }
        };

        let keys = data.auth.len();
        match self.store.initialize(data.auth) {
            Ok(_) => InitReport::new(InitOutcome::Seeded { keys }),
            Err(StoreError::AlreadyInitialized) => {
                InitReport::new(InitOutcome::AlreadyInitialized)
            }
            Err(err) => {
                tracing::warn!(error = %err, "initializer could not seed the store");
                InitReport::new(InitOutcome::Rejected(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    use crate::evaluate;
    use warden_core::{PermissionMap, RequiredPermissions};

    struct StaticLoader(Value);

    #[async_trait]
    impl InitialDataLoader for StaticLoader {
        async fn load(&self) -> anyhow::Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl InitialDataLoader for FailingLoader {
        async fn load(&self) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("connection refused").context("GET /bootstrap"))
        }
    }

    fn admin() -> RequiredPermissions {
        RequiredPermissions::from(["admin"])
    }

    #[tokio::test]
    async fn successful_load_seeds_store() {
        let store = AuthStore::shared();
        let init = Initializer::new(store.clone());

        let report = init
            .run(&StaticLoader(json!({ "auth": { "admin": true, "guest": false } })))
            .await;

        assert_eq!(report.outcome, InitOutcome::Seeded { keys: 2 });
        assert!(evaluate(&admin(), &store.get()).is_granted());
        assert!(!evaluate(&RequiredPermissions::from(["guest"]), &store.get()).is_granted());
    }

    #[tokio::test]
    async fn loader_failure_leaves_store_empty() {
        let store = AuthStore::shared();
        let init = Initializer::new(store.clone());

        let report = init.run(&FailingLoader).await;

        let InitOutcome::LoaderFailed(msg) = &report.outcome else {
            panic!("expected LoaderFailed, got {:?}", report.outcome);
        };
        assert!(msg.contains("connection refused"));
        assert!(store.get().is_empty());
        assert!(!store.is_initialized());
        assert!(!evaluate(&admin(), &store.get()).is_granted());
    }

    #[tokio::test]
    async fn malformed_payload_leaves_store_empty() {
        let store = AuthStore::shared();
        let init = Initializer::new(store.clone());

        let report = init
            .run(&StaticLoader(json!({ "auth": { "admin": "yes" } })))
            .await;

        assert!(matches!(
            report.outcome,
            InitOutcome::Malformed(InitialDataError::NonBooleanValue { .. })
        ));
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn missing_auth_key_is_malformed() {
        let store = AuthStore::shared();
        let report = Initializer::new(store.clone())
            .run_with(|| async { Ok(json!({ "user": "octocat" })) })
            .await;

        assert_eq!(report.outcome, InitOutcome::Malformed(InitialDataError::MissingAuth));
    }

    #[tokio::test]
    async fn blank_keys_do_not_discard_other_grants() {
        let store = AuthStore::shared();
        let report = Initializer::new(store.clone())
            .run_with(|| async { Ok(json!({ "auth": { "": true, "admin": true } })) })
            .await;

        assert!(report.is_seeded());
        assert_eq!(report.outcome, InitOutcome::Seeded { keys: 2 });
        assert!(evaluate(&admin(), &store.get()).is_granted());
    }

    #[tokio::test]
    async fn runs_loader_at_most_once() {
        let store = AuthStore::shared();
        let init = Initializer::new(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            init.run_with(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "auth": { "admin": true } }))
            })
            .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let again = init.run(&StaticLoader(json!({ "auth": {} }))).await;
        assert_eq!(again.outcome, InitOutcome::AlreadyRan);
        assert_eq!(store.get().get("admin"), Some(true));
    }

    #[tokio::test]
    async fn reports_store_already_initialized() {
        let store = AuthStore::shared();
        store.initialize(PermissionMap::from([("admin", true)])).unwrap();

        let report = Initializer::new(store.clone())
            .run(&StaticLoader(json!({ "auth": { "admin": false } })))
            .await;

        assert_eq!(report.outcome, InitOutcome::AlreadyInitialized);
        assert_eq!(store.get().get("admin"), Some(true));
    }
}

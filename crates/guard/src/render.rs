//! Conditional rendering guard.

use std::sync::Arc;

use warden_auth::{AccessDecision, AuthHandle, Watch, evaluate};
use warden_core::{PermissionMap, RequiredPermissions, RequiresPermissions};

use crate::config::{Fallback, GuardConfig};

/// Chooses between a protected output and a fallback.
///
/// `R` is whatever the host UI renders (a view node, a string, a widget id).
#[derive(Debug, Clone)]
pub struct RenderGuard<R> {
    required: RequiredPermissions,
    protected: R,
    fallback: Fallback<R>,
}

impl<R: Clone + Default> RenderGuard<R> {
    /// Guard with an empty placeholder as fallback.
    pub fn new(required: impl Into<RequiredPermissions>, protected: R) -> Self {
        Self {
            required: required.into(),
            protected,
            fallback: Fallback::Empty,
        }
    }

    /// Guard using the application's configured fallback.
    pub fn from_config(
        config: &GuardConfig<R>,
        required: impl Into<RequiredPermissions>,
        protected: R,
    ) -> Self {
        Self {
            fallback: config.fallback.clone(),
            ..Self::new(required, protected)
        }
    }

    /// Call-site fallback, overriding the configured one.
    pub fn with_fallback(mut self, fallback: R) -> Self {
        self.fallback = Fallback::Value(fallback);
        self
    }

    pub fn with_fallback_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.fallback = Fallback::producer(f);
        self
    }

    pub fn decide(&self, current: &PermissionMap) -> AccessDecision {
        evaluate(&self.required, current)
    }

    pub fn render(&self, current: &PermissionMap) -> R {
        self.output(&self.decide(current))
    }

    /// Output for an already computed decision.
    pub fn output(&self, decision: &AccessDecision) -> R {
        if decision.is_granted() {
            self.protected.clone()
        } else {
            tracing::debug!(
                required = ?self.required.keys(),
                reason = ?decision.reason,
                "render guard showing fallback"
            );
            self.fallback.produce()
        }
    }
}

impl<R> RequiresPermissions for RenderGuard<R> {
    fn required_permissions(&self) -> &RequiredPermissions {
        &self.required
    }
}

impl<R> RenderGuard<R>
where
    R: Clone + Default + Send + Sync + 'static,
{
    /// Keep the guard live: `on_render` is called now with the current
    /// output, then again every time the decision flips, until the returned
    /// [`MountedGuard`] drops. The first call is ordered before any update
    /// committed concurrently, so the last output always matches the store.
    pub fn mount<F>(self, handle: &AuthHandle, on_render: F) -> MountedGuard<R>
    where
        F: Fn(R) + Send + Sync + 'static,
    {
        let guard = Arc::new(self);
        let required = guard.required.clone();

        let watch = {
            let guard = Arc::clone(&guard);
            handle.follow_access(required, move |decision| {
                on_render(guard.output(decision));
            })
        };

        MountedGuard {
            guard,
            handle: handle.clone(),
            _watch: watch,
        }
    }
}

/// A render guard registered with the store.
#[derive(Debug)]
pub struct MountedGuard<R> {
    guard: Arc<RenderGuard<R>>,
    handle: AuthHandle,
    _watch: Watch,
}

impl<R: Clone + Default> MountedGuard<R> {
    /// Output for the store's current map.
    pub fn current(&self) -> R {
        self.guard.render(&self.handle.read())
    }

    pub fn guard(&self) -> &RenderGuard<R> {
        &self.guard
    }
}

//! Outbound API call guard (tower middleware).
//!
//! Wrap the client service with [`RequestGuardLayer`]; requests that carry a
//! [`RequiredPermissions`] extension are checked against the store before
//! they leave the process. Requests without the extension pass through.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tower::{BoxError, Layer, Service};

use warden_auth::{AccessDecision, AuthHandle};
use warden_core::RequiredPermissions;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("request forbidden: {}", describe(.decision))]
    Forbidden { decision: AccessDecision },

    #[error("inner service error: {0}")]
    Inner(#[source] BoxError),
}

impl GuardError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, GuardError::Forbidden { .. })
    }
}

fn describe(decision: &AccessDecision) -> String {
    let keys: Vec<&str> = decision.failed_keys().map(|k| k.as_str()).collect();
    format!("permission(s) {keys:?} not granted")
}

/// Attach permission requirements to an outgoing request.
pub trait RequirePermissionsExt {
    fn require(self, required: impl Into<RequiredPermissions>) -> Self;
}

impl<B> RequirePermissionsExt for http::Request<B> {
    fn require(mut self, required: impl Into<RequiredPermissions>) -> Self {
        self.extensions_mut().insert(required.into());
        self
    }
}

impl RequirePermissionsExt for http::request::Builder {
    fn require(self, required: impl Into<RequiredPermissions>) -> Self {
        self.extension(required.into())
    }
}

#[derive(Debug, Clone)]
pub struct RequestGuardLayer {
    handle: AuthHandle,
}

impl RequestGuardLayer {
    pub fn new(handle: AuthHandle) -> Self {
        Self { handle }
    }
}

impl<S> Layer<S> for RequestGuardLayer {
    type Service = RequestGuard<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestGuard {
            inner,
            handle: self.handle.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestGuard<S> {
    inner: S,
    handle: AuthHandle,
}

impl<S> RequestGuard<S> {
    pub fn new(inner: S, handle: AuthHandle) -> Self {
        Self { inner, handle }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, B> Service<http::Request<B>> for RequestGuard<S>
where
    S: Service<http::Request<B>>,
    S::Error: Into<BoxError>,
{
    type Response = S::Response;
    type Error = GuardError;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| GuardError::Inner(e.into()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        if let Some(required) = req.extensions().get::<RequiredPermissions>() {
            let decision = self.handle.check(required);
            if !decision.is_granted() {
                tracing::debug!(
                    method = %req.method(),
                    uri = %req.uri(),
                    reason = ?decision.reason,
                    "outbound request blocked"
                );
                return ResponseFuture {
                    kind: Kind::Denied(decision),
                };
            }
        }

        ResponseFuture {
            kind: Kind::Inner(Box::pin(self.inner.call(req))),
        }
    }
}

enum Kind<F> {
    Inner(Pin<Box<F>>),
    Denied(AccessDecision),
}

/// Future returned by [`RequestGuard`].
pub struct ResponseFuture<F> {
    kind: Kind<F>,
}

impl<F, T, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    type Output = Result<T, GuardError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().kind {
            Kind::Inner(fut) => fut
                .as_mut()
                .poll(cx)
                .map_err(|e| GuardError::Inner(e.into())),
            Kind::Denied(decision) => Poll::Ready(Err(GuardError::Forbidden {
                decision: decision.clone(),
            })),
        }
    }
}

//! `warden-guard`: enforcement points over the access evaluator.
//!
//! - [`RenderGuard`]: pick the protected or fallback output for a UI subtree
//! - [`NavigationGuard`]: proceed to a route or redirect to the no-access page
//! - [`RequestGuardLayer`]: refuse outbound API calls the user may not make
//!
//! Every guard is a thin adapter: the decision itself always comes from
//! `warden_auth::evaluate` against the store's current map.

pub mod config;
pub mod navigation;
pub mod render;
pub mod request;

pub use config::{DEFAULT_NO_ACCESS_PATH, Fallback, GuardConfig, NO_ACCESS_PATH_ENV};
pub use navigation::{Navigation, NavigationGuard, RouteTable};
pub use render::{MountedGuard, RenderGuard};
pub use request::{GuardError, RequestGuard, RequestGuardLayer, RequirePermissionsExt};

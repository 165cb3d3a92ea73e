//! Route access guard, evaluated once per navigation attempt.

use serde::Serialize;

use warden_auth::{AccessDecision, AuthHandle, evaluate};
use warden_core::{PermissionMap, RequiredPermissions};

use crate::config::GuardConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name`: matches exactly one segment.
    Param,
    /// `*` or `*name` in last position: matches the rest (possibly nothing).
    Rest,
}

#[derive(Debug, Clone)]
struct Route {
    pattern: String,
    segments: Vec<Segment>,
    required: RequiredPermissions,
}

impl Route {
    fn matches(&self, path: &[&str]) -> bool {
        let mut remaining = path.iter();
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Param => {
                    if remaining.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(lit) => match remaining.next() {
                    Some(part) if *part == lit.as_str() => {}
                    _ => return false,
                },
            }
        }
        remaining.next().is_none()
    }
}

/// Strip query/fragment and split into non-empty segments.
fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    let parts = split_path(pattern);
    let last = parts.len().saturating_sub(1);
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if part.starts_with(':') {
                Segment::Param
            } else if part.starts_with('*') && i == last {
                Segment::Rest
            } else {
                Segment::Literal((*part).to_string())
            }
        })
        .collect()
}

/// Declared permission requirements per route pattern.
///
/// Patterns use the router's usual syntax: `/repos/:id/settings`, `/admin/*`.
/// Lookup returns the first declared pattern that matches; routes without a
/// declaration are unrestricted.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, pattern: &str, required: impl Into<RequiredPermissions>) -> &mut Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            segments: parse_pattern(pattern),
            required: required.into(),
        });
        self
    }

    /// Builder-style [`RouteTable::declare`].
    pub fn route(mut self, pattern: &str, required: impl Into<RequiredPermissions>) -> Self {
        self.declare(pattern, required);
        self
    }

    /// Requirements declared for `path`, or `None` when undeclared.
    pub fn requirements_for(&self, path: &str) -> Option<&RequiredPermissions> {
        let parts = split_path(path);
        self.routes
            .iter()
            .find(|r| r.matches(&parts))
            .map(|r| &r.required)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    Proceed {
        path: String,
    },
    Redirect {
        from: String,
        to: String,
        decision: AccessDecision,
    },
}

impl Navigation {
    /// Where the router should actually go.
    pub fn destination(&self) -> &str {
        match self {
            Navigation::Proceed { path } => path,
            Navigation::Redirect { to, .. } => to,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Navigation::Redirect { .. })
    }
}

/// Decides, at navigation time, whether to enter a route.
///
/// The check is a snapshot: a later permission change does not undo a
/// navigation that already happened, it only affects the next attempt.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    routes: RouteTable,
    no_access_path: String,
}

impl NavigationGuard {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            no_access_path: crate::config::DEFAULT_NO_ACCESS_PATH.to_string(),
        }
    }

    pub fn from_config<R>(routes: RouteTable, config: &GuardConfig<R>) -> Self {
        Self {
            routes,
            no_access_path: config.no_access_path.clone(),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn no_access_path(&self) -> &str {
        &self.no_access_path
    }

    pub fn navigate(&self, target: &str, current: &PermissionMap) -> Navigation {
        // The no-access page must stay reachable, or denial would loop.
        if split_path(target) == split_path(&self.no_access_path) {
            return Navigation::Proceed {
                path: target.to_string(),
            };
        }

        let Some(required) = self.routes.requirements_for(target) else {
            return Navigation::Proceed {
                path: target.to_string(),
            };
        };

        let decision = evaluate(required, current);
        if decision.is_granted() {
            Navigation::Proceed {
                path: target.to_string(),
            }
        } else {
            tracing::debug!(
                target_path = target,
                redirect = %self.no_access_path,
                reason = ?decision.reason,
                "navigation denied"
            );
            Navigation::Redirect {
                from: target.to_string(),
                to: self.no_access_path.clone(),
                decision,
            }
        }
    }

    /// [`NavigationGuard::navigate`] against the store's map right now.
    pub fn navigate_with(&self, target: &str, handle: &AuthHandle) -> Navigation {
        self.navigate(target, &handle.read())
    }
}

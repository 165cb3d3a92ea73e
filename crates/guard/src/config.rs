//! Guard configuration (fallback output, no-access destination).

use std::sync::Arc;

/// Route the navigation guard redirects to when access is denied.
pub const DEFAULT_NO_ACCESS_PATH: &str = "/no-access";

/// Environment variable overriding [`DEFAULT_NO_ACCESS_PATH`].
pub const NO_ACCESS_PATH_ENV: &str = "WARDEN_NO_ACCESS_PATH";

/// What a guard shows instead of the protected output.
pub enum Fallback<R> {
    /// An empty placeholder (`R::default()`).
    Empty,
    /// A fixed output, cloned on every denial.
    Value(R),
    /// Built fresh on every denial.
    Producer(Arc<dyn Fn() -> R + Send + Sync>),
}

impl<R> Fallback<R> {
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self::Producer(Arc::new(f))
    }
}

impl<R: Clone + Default> Fallback<R> {
    pub fn produce(&self) -> R {
        match self {
            Fallback::Empty => R::default(),
            Fallback::Value(r) => r.clone(),
            Fallback::Producer(f) => f(),
        }
    }
}

impl<R> Default for Fallback<R> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<R: Clone> Clone for Fallback<R> {
    fn clone(&self) -> Self {
        match self {
            Fallback::Empty => Fallback::Empty,
            Fallback::Value(r) => Fallback::Value(r.clone()),
            Fallback::Producer(f) => Fallback::Producer(Arc::clone(f)),
        }
    }
}

impl<R: core::fmt::Debug> core::fmt::Debug for Fallback<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Fallback::Empty => f.write_str("Empty"),
            Fallback::Value(r) => f.debug_tuple("Value").field(r).finish(),
            Fallback::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Defaults shared by every guard of an application.
#[derive(Debug, Clone)]
pub struct GuardConfig<R> {
    pub fallback: Fallback<R>,
    pub no_access_path: String,
}

impl<R> Default for GuardConfig<R> {
    fn default() -> Self {
        Self {
            fallback: Fallback::Empty,
            no_access_path: DEFAULT_NO_ACCESS_PATH.to_string(),
        }
    }
}

impl<R> GuardConfig<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the no-access path taken from `WARDEN_NO_ACCESS_PATH`
    /// when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`GuardConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(NO_ACCESS_PATH_ENV) {
            let path = path.trim();
            if path.starts_with('/') {
                config.no_access_path = path.to_string();
            } else {
                tracing::warn!(
                    value = path,
                    "{NO_ACCESS_PATH_ENV} must be an absolute path; using {DEFAULT_NO_ACCESS_PATH}"
                );
            }
        }

        config
    }

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

    pub fn with_no_access_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.no_access_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_empty_fallback_and_no_access_route() {
        let config: GuardConfig<String> = GuardConfig::new();
        assert_eq!(config.fallback.produce(), "");
        assert_eq!(config.no_access_path, "/no-access");
    }

    #[test]
    fn fallback_value_and_producer() {
        let config: GuardConfig<String> = GuardConfig::new().with_fallback("denied".into());
        assert_eq!(config.fallback.produce(), "denied");

        let config: GuardConfig<String> =
            GuardConfig::new().with_fallback_fn(|| "built".to_string());
        assert_eq!(config.fallback.produce(), "built");
    }

    #[test]
    fn lookup_overrides_no_access_path() {
        let config: GuardConfig<()> = GuardConfig::from_lookup(|name| {
            (name == NO_ACCESS_PATH_ENV).then(|| "/forbidden".to_string())
        });
        assert_eq!(config.no_access_path, "/forbidden");
    }

    #[test]
    fn lookup_ignores_relative_path() {
        let config: GuardConfig<()> = GuardConfig::from_lookup(|_| Some("forbidden".to_string()));
        assert_eq!(config.no_access_path, DEFAULT_NO_ACCESS_PATH);
    }

    #[test]
    fn builder_normalizes_leading_slash() {
        let config: GuardConfig<()> = GuardConfig::new().with_no_access_path("denied");
        assert_eq!(config.no_access_path, "/denied");
    }
}

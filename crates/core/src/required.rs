use serde::{Deserialize, Serialize};

use crate::key::PermissionKey;

/// Ordered list of permission keys guarding a resource.
///
/// An empty list means "unrestricted". Duplicates are kept as declared and
/// collapsed by [`RequiredPermissions::unique`] at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredPermissions(Vec<PermissionKey>);

impl RequiredPermissions {
    /// No restriction; always allowed.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PermissionKey>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys as declared (order and duplicates preserved).
    pub fn keys(&self) -> &[PermissionKey] {
        &self.0
    }

    /// Keys in first-occurrence order with duplicates removed.
    pub fn unique(&self) -> Vec<&PermissionKey> {
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::with_capacity(self.0.len());
        for key in &self.0 {
            if seen.insert(key.as_str()) {
                unique.push(key);
            }
        }
        unique
    }
}

impl<K: Into<PermissionKey>> FromIterator<K> for RequiredPermissions {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<K: Into<PermissionKey>, const N: usize> From<[K; N]> for RequiredPermissions {
    fn from(keys: [K; N]) -> Self {
        Self::new(keys)
    }
}

impl From<Vec<PermissionKey>> for RequiredPermissions {
    fn from(keys: Vec<PermissionKey>) -> Self {
        Self(keys)
    }
}

/// Authorization contract for anything that declares its own requirements.
///
/// Implement this on routes, components or outbound requests; guards query it
/// before letting the resource through.
pub trait RequiresPermissions {
    fn required_permissions(&self) -> &RequiredPermissions;
}

impl RequiresPermissions for RequiredPermissions {
    fn required_permissions(&self) -> &RequiredPermissions {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_keeps_first_occurrence_order() {
        let r = RequiredPermissions::from(["b", "a", "b", "c", "a"]);
        let keys: Vec<&str> = r.unique().into_iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn empty_is_unrestricted() {
        assert!(RequiredPermissions::none().is_unrestricted());
        assert!(!RequiredPermissions::from(["admin"]).is_unrestricted());
    }
}

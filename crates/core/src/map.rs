//! The permission map: permission key → boolean grant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::PermissionKey;

/// Current grant status for every known permission key.
///
/// Absence of a key means "not granted". The map is ordered only so that
/// debug output and serialization are stable; order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<PermissionKey, bool>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup: `None` when the key is unknown to this map.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// Fail-closed lookup: unknown keys are not granted.
    pub fn is_granted(&self, key: &str) -> bool {
        self.get(key).unwrap_or(false)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<PermissionKey>, granted: bool) -> Option<bool> {
        self.0.insert(key.into(), granted)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<PermissionKey>, granted: bool) -> Self {
        self.insert(key, granted);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PermissionKey, bool)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &PermissionKey> {
        self.0.keys()
    }

    /// Right-biased shallow merge: keys in `partial` overwrite, the rest persist.
    pub fn merge(&self, partial: &PermissionMap) -> PermissionMap {
        let mut merged = self.0.clone();
        merged.extend(partial.0.iter().map(|(k, v)| (k.clone(), *v)));
        Self(merged)
    }
}

impl<K: Into<PermissionKey>> FromIterator<(K, bool)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<K: Into<PermissionKey>, const N: usize> From<[(K, bool); N]> for PermissionMap {
    fn from(entries: [(K, bool); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for PermissionMap {
    type Item = (PermissionKey, bool);
    type IntoIter = std::collections::btree_map::IntoIter<PermissionKey, bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Permission identifier.
///
/// Keys are opaque, case-sensitive strings (e.g. "starRepo", "admin").
/// There is deliberately no wildcard key: every grant is named explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(Cow<'static, str>);

impl PermissionKey {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Validating constructor for hand-written keys (settings, route
    /// declarations). Blank names are rejected.
    pub fn parse(name: &str) -> CoreResult<Self> {
        if name.trim().is_empty() {
            return Err(CoreError::invalid_key(name));
        }
        Ok(Self(Cow::Owned(name.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PermissionKey {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PermissionKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for PermissionKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_sensitive() {
        assert_ne!(PermissionKey::new("Admin"), PermissionKey::new("admin"));
    }

    #[test]
    fn parse_rejects_blank_keys() {
        assert!(PermissionKey::parse("").is_err());
        assert!(PermissionKey::parse("   ").is_err());
        assert_eq!(PermissionKey::parse("admin").unwrap().as_str(), "admin");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&PermissionKey::new("starRepo")).unwrap();
        assert_eq!(json, "\"starRepo\"");
    }
}

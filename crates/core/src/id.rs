//! Strongly-typed identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Opaque registration token handed out when an observer subscribes.
///
/// Tokens are never reused within a process, so unsubscribing a stale token is
/// always harmless.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverToken(Uuid);

impl ObserverToken {
    /// Create a new token.
    ///
    /// Uses UUIDv7 (time-ordered), so tokens sort in registration order.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObserverToken {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ObserverToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ObserverToken {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<ObserverToken> for Uuid {
    fn from(value: ObserverToken) -> Self {
        value.0
    }
}

impl FromStr for ObserverToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s)
            .map(Self)
            .map_err(|e| CoreError::invalid_id(e.to_string()))
    }
}

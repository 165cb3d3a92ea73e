use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use warden_core::{PermissionKey, PermissionMap};

/// Initial data model (transport-agnostic).
///
/// This is the minimal shape the bootstrap loader must produce:
/// `{ "auth": { "<permission>": <bool>, ... } }`. Other top-level keys are the
/// host application's business and are ignored.
///
/// Only [`InitialData::from_value`] builds one from a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitialData {
    pub auth: PermissionMap,
}

/// The loader produced something that is not valid initial data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitialDataError {
    #[error("initial data must be an object, found {0}")]
    NotAnObject(&'static str),

    #[error("initial data has no `auth` key")]
    MissingAuth,

    #[error("`auth` must be an object, found {0}")]
    AuthNotAnObject(&'static str),

    #[error("permission '{key}' must be a boolean, found {found}")]
    NonBooleanValue { key: String, found: &'static str },
}

impl InitialData {
    /// Validate an untrusted loader payload.
    ///
    /// Every value under `auth` must be a JSON boolean; there is no coercion of
    /// `"true"`, `1` or `null`. Keys are taken verbatim, the empty string
    /// included.
    pub fn from_value(value: &Value) -> Result<Self, InitialDataError> {
        let root = value
            .as_object()
            .ok_or(InitialDataError::NotAnObject(json_kind(value)))?;

        let auth = root.get("auth").ok_or(InitialDataError::MissingAuth)?;
        let entries = auth
            .as_object()
            .ok_or(InitialDataError::AuthNotAnObject(json_kind(auth)))?;

        let mut map = PermissionMap::new();
        for (key, granted) in entries {
            let granted = granted
                .as_bool()
                .ok_or_else(|| InitialDataError::NonBooleanValue {
                    key: key.clone(),
                    found: json_kind(granted),
                })?;
            map.insert(PermissionKey::new(key.clone()), granted);
        }

        Ok(Self { auth: map })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

use serde::{Deserialize, Serialize};

use warden_core::{PermissionKey, PermissionMap, RequiredPermissions};

/// Why an access decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Every required key is present and true.
    Granted,
    /// Denied, and every failing key was simply absent from the map.
    ///
    /// A diagnostic refinement of [`DecisionReason::Denied`]: callers that
    /// only need "denied or not" should go through
    /// [`AccessDecision::is_granted`], which treats both the same.
    MissingKey,
    /// Denied, and at least one required key is explicitly false.
    Denied,
}

/// Outcome of checking required permissions against the current map.
///
/// `missing` and `refused` are diagnostics only; the boolean outcome is
/// fully determined by [`AccessDecision::is_granted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub reason: DecisionReason,

    /// Required keys the map knows nothing about (treated as false).
    pub missing: Vec<PermissionKey>,

    /// Required keys the map explicitly sets to false.
    pub refused: Vec<PermissionKey>,
}

impl AccessDecision {
    pub fn granted() -> Self {
        Self {
            reason: DecisionReason::Granted,
            missing: Vec::new(),
            refused: Vec::new(),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.reason == DecisionReason::Granted
    }

    /// Every key that blocked access, absent ones first.
    pub fn failed_keys(&self) -> impl Iterator<Item = &PermissionKey> {
        self.missing.iter().chain(self.refused.iter())
    }
}

/// Decide whether `required` is satisfied by `current`.
///
/// - No IO
/// - No panics
/// - Empty `required` always grants
/// - Absent keys count as false; all keys must be true (AND)
pub fn evaluate(required: &RequiredPermissions, current: &PermissionMap) -> AccessDecision {
    if required.is_unrestricted() {
        return AccessDecision::granted();
    }

    let mut missing = Vec::new();
    let mut refused = Vec::new();

    for key in required.unique() {
        match current.get(key.as_str()) {
            Some(true) => {}
            Some(false) => refused.push(key.clone()),
            None => missing.push(key.clone()),
        }
    }

    let reason = if missing.is_empty() && refused.is_empty() {
        DecisionReason::Granted
    } else if refused.is_empty() {
        DecisionReason::MissingKey
    } else {
        DecisionReason::Denied
    };

    AccessDecision {
        reason,
        missing,
        refused,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (diagnostics)
// ─────────────────────────────────────────────────────────────────────────────

/// Human-readable account of an access decision.
///
/// Meant for developer tooling and logs: it answers "why is this button
/// hidden?" without changing the decision itself.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    /// The keys that were required, as declared.
    pub required: Vec<String>,

    pub granted: bool,

    pub reason: DecisionReason,

    /// One-line summary of the decision.
    pub summary: String,

    /// Keys currently granted in the map (sorted).
    pub granted_keys: Vec<String>,

    /// What would have to change for access to be granted.
    pub suggestions: Vec<String>,
}

/// Explain why `evaluate(required, current)` decided the way it did.
pub fn explain(required: &RequiredPermissions, current: &PermissionMap) -> AccessExplanation {
    let decision = evaluate(required, current);

    let granted_keys: Vec<String> = current
        .iter()
        .filter(|(_, granted)| *granted)
        .map(|(k, _)| k.to_string())
        .collect();

    let summary = match decision.reason {
        DecisionReason::Granted if required.is_unrestricted() => {
            "No permissions required; resource is unrestricted".to_string()
        }
        DecisionReason::Granted => format!(
            "All {} required permission(s) are granted",
            required.unique().len()
        ),
        DecisionReason::MissingKey => format!(
            "Permission(s) {:?} are unknown to the current map and treated as not granted",
            names(&decision.missing)
        ),
        DecisionReason::Denied => format!(
            "Permission(s) {:?} are explicitly not granted",
            names(&decision.refused)
        ),
    };

    let mut suggestions = Vec::new();
    for key in &decision.refused {
        suggestions.push(format!("Set '{}' to true in the permission map", key));
    }
    for key in &decision.missing {
        suggestions.push(format!(
            "Add '{}' to the initial data or a later update (check for typos; keys are case-sensitive)",
            key
        ));
    }

    AccessExplanation {
        required: required.keys().iter().map(|k| k.to_string()).collect(),
        granted: decision.is_granted(),
        reason: decision.reason,
        summary,
        granted_keys,
        suggestions,
    }
}

fn names(keys: &[PermissionKey]) -> Vec<&str> {
    keys.iter().map(|k| k.as_str()).collect()
}

//! `warden-auth`: permission store, access evaluation and startup seeding.
//!
//! This crate is intentionally decoupled from any UI framework, router or HTTP
//! client; those live behind the adapters in `warden-guard`.

pub mod evaluate;
pub mod handle;
pub mod initializer;
pub mod payload;
pub mod store;

pub use evaluate::{AccessDecision, AccessExplanation, DecisionReason, evaluate, explain};
pub use handle::{AuthHandle, Watch};
pub use initializer::{InitOutcome, InitReport, InitialDataLoader, Initializer};
pub use payload::{InitialData, InitialDataError};
pub use store::{AuthStore, StoreError};

pub use warden_core::{PermissionKey, PermissionMap, RequiredPermissions, RequiresPermissions};

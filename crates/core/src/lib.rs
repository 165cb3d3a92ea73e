//! `warden-core`: permission data model shared by every warden crate.
//!
//! This crate contains **pure data** primitives (no IO, no locking, no async).

pub mod error;
pub mod id;
pub mod key;
pub mod map;
pub mod required;

pub use error::{CoreError, CoreResult};
pub use id::ObserverToken;
pub use key::PermissionKey;
pub use map::PermissionMap;
pub use required::{RequiredPermissions, RequiresPermissions};

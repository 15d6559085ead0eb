//! # warden-rbac: Role-Based Access Control
//!
//! Decides what a principal may do:
//! - **Permission catalog** ([`PermissionCatalog`]): the static table of
//!   (action × entity) permission tags
//! - **Cascade engine** ([`CascadeEngine`]): keeps each principal's cached
//!   effective permission set equal to the union of its roles' permissions
//! - **Permission checks** ([`PermissionCheck`]): `Granted`, `Denied`, or
//!   `SystemError` when the answer could not be determined
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Role change (assign / remove / replace)      │
//! └─────────────────┬────────────────────────────┘
//!                   │
//!                   ▼
//! ┌──────────────────────────────────────────────┐
//! │  CascadeEngine (one store transaction)        │
//! │  ├─ load role assignments                     │
//! │  ├─ load each role's permissions              │
//! │  ├─ union                                     │
//! │  └─ clear + append effective permissions      │
//! └─────────────────┬────────────────────────────┘
//!                   │  commit, or roll back on any failure
//!                   ▼
//! ┌──────────────────────────────────────────────┐
//! │  Principal.permissions (cached effective set) │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use warden_rbac::{Action, CascadeEngine, PermissionCatalog, RbacSettings, RoleSeed};
//! use warden_store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let alice = store.insert_principal("alice@example.com", None).unwrap();
//!
//! let engine = CascadeEngine::new(store, RbacSettings::default());
//! engine
//!     .seed(&PermissionCatalog::standard(), &RoleSeed::defaults())
//!     .unwrap();
//!
//! let admin = engine.role_id("admin").unwrap();
//! engine.assign_role(alice, admin).unwrap();
//!
//! assert!(engine.check(alice, Action::Delete, "UserAPIKeys").is_granted());
//! ```

use thiserror::Error;
use warden_store::StoreError;

pub mod catalog;
pub mod engine;


pub use catalog::{Action, CatalogEntry, PermissionCatalog, STANDARD_ENTITIES};
pub use engine::{CascadeEngine, RbacSettings, RoleSeed, SeedSummary};

/// Outcome of a permission check.
///
/// `Denied` means the tag is absent from the principal's effective set.
/// `SystemError` means the check could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    Granted,
    Denied,
    SystemError(String),
}

impl PermissionCheck {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Error type for RBAC administration and cascades.
#[derive(Debug, Error)]
pub enum RbacError {
    /// A unique key (role name, permission tag, catalog entry) would be duplicated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced role, permission or principal does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store failed for a reason unrelated to the request.
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RbacError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(detail) => Self::Conflict(detail),
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            other => Self::Store(other),
        }
    }
}

/// Result type for RBAC operations.
pub type Result<T> = std::result::Result<T, RbacError>;

//! # warden-store: persistence seam for `Warden`
//!
//! Warden does not own a storage engine. This crate defines the contracts
//! the authorization core needs from one, plus an in-memory reference
//! implementation:
//!
//! - [`RbacStore`] / [`RbacTransaction`]: Role, Permission and assignment
//!   tables, accessed inside an all-or-nothing transaction
//! - [`PrincipalLookup`]: resolves API keys and token identities to principals
//! - [`MemoryStore`]: snapshot-isolated implementation of both, used by tests
//!   and by embedders that keep authorization state in process
//!
//! ## Transactions
//!
//! ```text
//! transaction(f)
//!   ├─ take the writer lock (serializes cascades)
//!   ├─ clone the committed tables into a working copy
//!   ├─ run f against the working copy
//!   ├─ Ok  → swap the working copy in (readers see the new snapshot)
//!   └─ Err → drop the working copy (readers keep the old snapshot)
//! ```

use std::sync::Arc;

use thiserror::Error;
use warden_types::{Permission, PermissionId, PermissionTag, Principal, PrincipalId, Role, RoleId};

pub mod api_key;
mod memory;

pub use api_key::{ApiKey, ApiKeyRecord, hash_api_key};
pub use memory::{IdentityProfile, MemoryStore};

/// Errors raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A unique key would be duplicated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Operations available inside a single RBAC transaction.
///
/// Nothing done through this trait is visible outside the transaction until
/// the enclosing [`RbacStore::transaction`] call returns `Ok`.
pub trait RbacTransaction {
    /// Loads a live principal with its role assignments and cached
    /// effective permissions. Tombstoned principals are `None`.
    fn principal(&self, id: PrincipalId) -> Result<Option<Principal>>;

    /// Whether a principal row exists but carries a tombstone.
    fn is_tombstoned(&self, id: PrincipalId) -> Result<bool>;

    fn role_assignments(&self, principal: PrincipalId) -> Result<Vec<RoleId>>;

    /// Replaces the principal's role assignments. Does not cascade.
    fn set_role_assignments(&mut self, principal: PrincipalId, roles: &[RoleId]) -> Result<()>;

    fn principals_with_role(&self, role: RoleId) -> Result<Vec<PrincipalId>>;

    fn role(&self, id: RoleId) -> Result<Option<Role>>;

    fn role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Inserts a role with no permissions. Role names are unique.
    fn insert_role(&mut self, name: &str, description: &str) -> Result<RoleId>;

    fn set_role_permissions(&mut self, role: RoleId, permissions: &[PermissionId]) -> Result<()>;

    fn permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    fn permission_by_tag(&self, tag: &PermissionTag) -> Result<Option<Permission>>;

    /// Inserts a permission. Tags are unique.
    fn insert_permission(&mut self, tag: &PermissionTag, description: &str)
    -> Result<PermissionId>;

    fn clear_effective_permissions(&mut self, principal: PrincipalId) -> Result<()>;

    fn append_effective_permissions(
        &mut self,
        principal: PrincipalId,
        permissions: &[PermissionId],
    ) -> Result<()>;
}

/// A store that can run RBAC transactions.
pub trait RbacStore: Send + Sync {
    /// Runs `f` inside one transaction boundary.
    ///
    /// Commits when `f` returns `Ok`; discards every change when it returns
    /// `Err` or when the transaction itself cannot be opened.
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn RbacTransaction) -> std::result::Result<T, E>,
        E: From<StoreError>;
}

impl<S: RbacStore + ?Sized> RbacStore for Arc<S> {
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn RbacTransaction) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        (**self).transaction(f)
    }
}

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityRef<'a> {
    pub email: &'a str,
    /// Identity-provider name (`iss`).
    pub issuer: &'a str,
    /// User id at that provider (`sub`).
    pub subject: &'a str,
    /// Set when `issuer` is this service's own issuer. The subject is then a
    /// principal id rather than an external user id.
    pub local: bool,
}

/// Resolves request credentials to a principal.
pub trait PrincipalLookup: Send + Sync {
    /// Finds the principal bound to a plaintext API key.
    fn find_by_api_key(&self, api_key: &str) -> Result<Option<Principal>>;

    /// Finds the principal behind an (email, issuer, subject) triple.
    fn find_by_identity(&self, identity: &IdentityRef<'_>) -> Result<Option<Principal>>;
}

impl<L: PrincipalLookup + ?Sized> PrincipalLookup for Arc<L> {
    fn find_by_api_key(&self, api_key: &str) -> Result<Option<Principal>> {
        (**self).find_by_api_key(api_key)
    }

    fn find_by_identity(&self, identity: &IdentityRef<'_>) -> Result<Option<Principal>> {
        (**self).find_by_identity(identity)
    }
}

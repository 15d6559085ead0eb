//! Cascade engine: role assignment and effective-permission recomputation.
//!
//! Every mutation that can change what a principal may do runs inside a
//! single [`RbacStore::transaction`] together with the recomputation it
//! triggers, so readers only ever observe the set before or after the
//! whole change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use warden_store::{RbacStore, RbacTransaction};
use warden_types::{PermissionId, PermissionSet, PermissionTag, Principal, PrincipalId, RoleId};

use crate::catalog::{Action, PermissionCatalog};
use crate::{PermissionCheck, RbacError, Result};

/// Role names the engine treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacSettings {
    /// Role that receives every catalog permission at seed time.
    pub admin_role: String,
    /// Role given to newly signed-up principals.
    pub default_role: String,
}

impl Default for RbacSettings {
    fn default() -> Self {
        Self {
            admin_role: "admin".to_string(),
            default_role: "user".to_string(),
        }
    }
}

/// A role to create at seed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl RoleSeed {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// The `admin` and `user` roles.
    pub fn defaults() -> Vec<RoleSeed> {
        vec![
            RoleSeed::new("admin", "Administrator role"),
            RoleSeed::new("user", "User role"),
        ]
    }
}

/// What [`CascadeEngine::seed`] inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub permissions: usize,
    pub roles: usize,
}

/// Maintains role assignments and each principal's effective permissions.
#[derive(Debug)]
pub struct CascadeEngine<S> {
    store: S,
    settings: RbacSettings,
}

impl<S: RbacStore> CascadeEngine<S> {
    /// Creates an engine over `store`. Nothing is read until the first call.
    pub fn new(store: S, settings: RbacSettings) -> Self {
        Self { store, settings }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the admin and default role names.
    pub fn settings(&self) -> &RbacSettings {
        &self.settings
    }

    /// Replaces the principal's effective set with the union of its current
    /// roles' permissions.
    ///
    /// # Errors
    ///
    /// Any failure aborts the transaction and leaves the previous set in place.
    pub fn recompute_effective_permissions(
        &self,
        principal: PrincipalId,
    ) -> Result<PermissionSet> {
        self.store.transaction(|tx| recompute(tx, principal))
    }

    /// Adds a role to the principal and cascades. Assigning a role the
    /// principal already holds is a no-op apart from the recomputation.
    pub fn assign_role(&self, principal: PrincipalId, role: RoleId) -> Result<PermissionSet> {
        self.store.transaction(|tx| {
            let mut roles = tx.role_assignments(principal)?;
            if !roles.contains(&role) {
                roles.push(role);
            }
            tx.set_role_assignments(principal, &roles)?;
            recompute(tx, principal)
        })
    }

    /// Removes a role from the principal and cascades.
    pub fn remove_role(&self, principal: PrincipalId, role: RoleId) -> Result<PermissionSet> {
        self.store.transaction(|tx| {
            let mut roles = tx.role_assignments(principal)?;
            roles.retain(|r| *r != role);
            tx.set_role_assignments(principal, &roles)?;
            recompute(tx, principal)
        })
    }

    /// Replaces all of the principal's roles and cascades.
    pub fn replace_roles(
        &self,
        principal: PrincipalId,
        roles: &[RoleId],
    ) -> Result<PermissionSet> {
        self.store.transaction(|tx| {
            tx.set_role_assignments(principal, roles)?;
            recompute(tx, principal)
        })
    }

    /// Assigns the configured default role, as done at sign-up.
    pub fn assign_default_role(&self, principal: PrincipalId) -> Result<PermissionSet> {
        let default_role = self.settings.default_role.as_str();
        self.store.transaction(|tx| {
            let role = role_named(tx, default_role)?;
            let mut roles = tx.role_assignments(principal)?;
            if !roles.contains(&role) {
                roles.push(role);
            }
            tx.set_role_assignments(principal, &roles)?;
            recompute(tx, principal)
        })
    }

    /// Looks up a role id by name.
    pub fn role_id(&self, name: &str) -> Result<RoleId> {
        self.store.transaction(|tx| role_named(tx, name))
    }

    /// Creates a role with the given permissions.
    ///
    /// # Errors
    ///
    /// [`RbacError::Conflict`] if the name is taken, [`RbacError::NotFound`]
    /// if a tag has no permission record.
    pub fn create_role(
        &self,
        name: &str,
        description: &str,
        tags: &[PermissionTag],
    ) -> Result<RoleId> {
        let role = self.store.transaction(|tx| {
            let role = tx.insert_role(name, description)?;
            let permissions = resolve_tags(tx, tags)?;
            attach_and_cascade(tx, role, &permissions)?;
            Ok::<_, RbacError>(role)
        })?;
        info!(role = %role, name, permissions = tags.len(), "role created");
        Ok(role)
    }

    /// Replaces a role's permissions and cascades to every holder.
    ///
    /// Returns the number of principals whose effective set was recomputed.
    pub fn set_role_permissions(&self, role: RoleId, tags: &[PermissionTag]) -> Result<usize> {
        let holders = self.store.transaction(|tx| {
            let permissions = resolve_tags(tx, tags)?;
            attach_and_cascade(tx, role, &permissions)
        })?;
        info!(role = %role, permissions = tags.len(), holders, "role permissions replaced");
        Ok(holders)
    }

    /// Inserts the catalog's permissions and the given roles in one
    /// transaction. The admin role gets every permission; the rest get none.
    ///
    /// # Errors
    ///
    /// [`RbacError::Conflict`] on a tag or role-name collision and
    /// [`RbacError::NotFound`] if the admin role is not among `roles`.
    /// Nothing is persisted on error.
    pub fn seed(&self, catalog: &PermissionCatalog, roles: &[RoleSeed]) -> Result<SeedSummary> {
        let admin_role = self.settings.admin_role.as_str();
        let result: Result<SeedSummary> = self.store.transaction(|tx| {
            let mut permissions = Vec::with_capacity(catalog.len());
            for entry in catalog.entries() {
                permissions.push(tx.insert_permission(&entry.tag, &entry.description)?);
            }

            let mut admin = None;
            for seed in roles {
                let id = tx.insert_role(&seed.name, &seed.description)?;
                if seed.name == admin_role {
                    admin = Some(id);
                }
            }
            let admin = admin.ok_or_else(|| RbacError::NotFound(format!("role {admin_role}")))?;
            attach_and_cascade(tx, admin, &permissions)?;

            Ok(SeedSummary {
                permissions: permissions.len(),
                roles: roles.len(),
            })
        });

        match &result {
            Ok(summary) => info!(
                permissions = summary.permissions,
                roles = summary.roles,
                "RBAC seeded"
            ),
            Err(e) => error!(error = %e, "RBAC seeding aborted"),
        }
        result
    }

    /// Checks whether `principal`'s cached effective set grants `action` on
    /// `entity`. The entity is normalized before the tag is formatted.
    pub fn has_permission(
        &self,
        principal: &Principal,
        action: Action,
        entity: &str,
    ) -> PermissionCheck {
        self.has_permission_tag(principal, &action.tag(entity))
    }

    /// Checks an already formatted tag.
    pub fn has_permission_tag(
        &self,
        principal: &Principal,
        tag: &PermissionTag,
    ) -> PermissionCheck {
        if principal.is_deleted() {
            warn!(principal = %principal.id, tag = %tag, "permission check on tombstoned principal");
            return PermissionCheck::Denied;
        }
        if principal.permissions.contains(tag) {
            debug!(principal = %principal.id, tag = %tag, "permission granted");
            PermissionCheck::Granted
        } else {
            warn!(principal = %principal.id, tag = %tag, "permission denied");
            PermissionCheck::Denied
        }
    }

    /// Whether the principal currently holds the named role.
    pub fn has_role(&self, principal: &Principal, role_name: &str) -> Result<bool> {
        match self.role_id(role_name) {
            Ok(id) => Ok(principal.has_role(id)),
            Err(RbacError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Loads the principal from the store and checks the permission.
    ///
    /// A tombstoned principal is [`PermissionCheck::Denied`]. An unknown id
    /// or a failed load yields [`PermissionCheck::SystemError`].
    pub fn check(&self, principal: PrincipalId, action: Action, entity: &str) -> PermissionCheck {
        let loaded = self.store.transaction::<_, RbacError, _>(|tx| {
            let live = tx.principal(principal)?;
            let tombstoned = live.is_none() && tx.is_tombstoned(principal)?;
            Ok((live, tombstoned))
        });
        match loaded {
            Ok((Some(p), _)) => self.has_permission(&p, action, entity),
            Ok((None, true)) => {
                warn!(principal = %principal, action = %action, entity, "permission check on tombstoned principal");
                PermissionCheck::Denied
            }
            Ok((None, false)) => {
                error!(principal = %principal, "permission check for unknown principal");
                PermissionCheck::SystemError(format!("principal {principal} not found"))
            }
            Err(e) => {
                error!(principal = %principal, error = %e, "permission check failed");
                PermissionCheck::SystemError(e.to_string())
            }
        }
    }
}

fn role_named(tx: &mut dyn RbacTransaction, name: &str) -> Result<RoleId> {
    tx.role_by_name(name)?
        .map(|role| role.id)
        .ok_or_else(|| RbacError::NotFound(format!("role {name}")))
}

fn resolve_tags(
    tx: &mut dyn RbacTransaction,
    tags: &[PermissionTag],
) -> Result<Vec<PermissionId>> {
    tags.iter()
        .map(|tag| {
            tx.permission_by_tag(tag)?
                .map(|p| p.id)
                .ok_or_else(|| RbacError::NotFound(format!("permission {tag}")))
        })
        .collect()
}

/// Sets a role's permissions and recomputes every holder. Returns the
/// holder count.
fn attach_and_cascade(
    tx: &mut dyn RbacTransaction,
    role: RoleId,
    permissions: &[PermissionId],
) -> Result<usize> {
    tx.set_role_permissions(role, permissions)?;
    let holders = tx.principals_with_role(role)?;
    for principal in &holders {
        recompute(tx, *principal)?;
    }
    Ok(holders.len())
}

fn recompute(tx: &mut dyn RbacTransaction, principal: PrincipalId) -> Result<PermissionSet> {
    let roles = tx.role_assignments(principal)?;

    let mut ids = BTreeSet::new();
    let mut effective = PermissionSet::empty();
    for role_id in &roles {
        let role = tx
            .role(*role_id)?
            .ok_or_else(|| RbacError::NotFound(format!("role {role_id}")))?;
        for permission_id in role.permissions {
            let permission = tx
                .permission(permission_id)?
                .ok_or_else(|| RbacError::NotFound(format!("permission {permission_id}")))?;
            ids.insert(permission_id);
            effective.grant(permission.tag);
        }
    }

    let ids: Vec<PermissionId> = ids.into_iter().collect();
    tx.clear_effective_permissions(principal)?;
    tx.append_effective_permissions(principal, &ids)?;

    debug!(
        principal = %principal,
        roles = roles.len(),
        permissions = effective.len(),
        "effective permissions recomputed"
    );
    Ok(effective)
}

//! In-memory store with snapshot transactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_types::{
    ApiKeyId, Permission, PermissionId, PermissionSet, PermissionTag, Principal, PrincipalId,
    Role, RoleId,
};

use crate::api_key::{ApiKey, ApiKeyRecord, hash_api_key};
use crate::{
    IdentityRef, PrincipalLookup, RbacStore, RbacTransaction, Result, StoreError,
};

/// Link between an external identity-provider account and a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub principal: PrincipalId,
    pub email: String,
    pub issuer: String,
    pub external_subject: String,
}

#[derive(Debug, Clone)]
struct PrincipalRow {
    email: String,
    display_name: Option<String>,
    roles: Vec<RoleId>,
    effective: Vec<PermissionId>,
    created_by: Option<PrincipalId>,
    updated_by: Option<PrincipalId>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    principals: HashMap<PrincipalId, PrincipalRow>,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    api_keys: BTreeMap<ApiKeyId, ApiKeyRecord>,
    profiles: Vec<IdentityProfile>,
    next_role: u64,
    next_permission: u64,
    next_api_key: u64,
}

impl Tables {
    fn live_row(&self, id: PrincipalId) -> Option<&PrincipalRow> {
        self.principals.get(&id).filter(|row| row.deleted_at.is_none())
    }

    fn live_row_mut(&mut self, id: PrincipalId) -> Result<&mut PrincipalRow> {
        self.principals
            .get_mut(&id)
            .filter(|row| row.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("principal", id))
    }

    fn ensure_role(&self, id: RoleId) -> Result<()> {
        if self.roles.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found("role", id))
        }
    }

    fn ensure_permission(&self, id: PermissionId) -> Result<()> {
        if self.permissions.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found("permission", id))
        }
    }

    fn materialize(
        &self,
        id: PrincipalId,
        row: &PrincipalRow,
        api_key: Option<ApiKeyId>,
    ) -> Result<Principal> {
        let mut permissions = PermissionSet::empty();
        for permission_id in &row.effective {
            let permission = self
                .permissions
                .get(permission_id)
                .ok_or_else(|| StoreError::not_found("permission", permission_id))?;
            permissions.grant(permission.tag.clone());
        }

        Ok(Principal {
            id,
            email: row.email.clone(),
            display_name: row.display_name.clone(),
            roles: row.roles.clone(),
            permissions,
            api_key,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_at: row.deleted_at,
        })
    }
}

fn push_unique<T: PartialEq + Copy>(into: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !into.contains(item) {
            into.push(*item);
        }
    }
}

struct MemoryTransaction<'a> {
    tables: &'a mut Tables,
}

impl RbacTransaction for MemoryTransaction<'_> {
    fn principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        self.tables
            .live_row(id)
            .map(|row| self.tables.materialize(id, row, None))
            .transpose()
    }

    fn is_tombstoned(&self, id: PrincipalId) -> Result<bool> {
        Ok(self
            .tables
            .principals
            .get(&id)
            .is_some_and(|row| row.deleted_at.is_some()))
    }

    fn role_assignments(&self, principal: PrincipalId) -> Result<Vec<RoleId>> {
        self.tables
            .live_row(principal)
            .map(|row| row.roles.clone())
            .ok_or_else(|| StoreError::not_found("principal", principal))
    }

    fn set_role_assignments(&mut self, principal: PrincipalId, roles: &[RoleId]) -> Result<()> {
        for role in roles {
            self.tables.ensure_role(*role)?;
        }
        let row = self.tables.live_row_mut(principal)?;
        row.roles.clear();
        push_unique(&mut row.roles, roles);
        Ok(())
    }

    fn principals_with_role(&self, role: RoleId) -> Result<Vec<PrincipalId>> {
        let mut holders: Vec<PrincipalId> = self
            .tables
            .principals
            .iter()
            .filter(|(_, row)| row.deleted_at.is_none() && row.roles.contains(&role))
            .map(|(id, _)| *id)
            .collect();
        holders.sort();
        Ok(holders)
    }

    fn role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.tables.roles.get(&id).cloned())
    }

    fn role_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.tables.roles.values().find(|r| r.name == name).cloned())
    }

    fn insert_role(&mut self, name: &str, description: &str) -> Result<RoleId> {
        if self.tables.roles.values().any(|r| r.name == name) {
            return Err(StoreError::Conflict(format!("role name {name:?} already exists")));
        }
        self.tables.next_role += 1;
        let id = RoleId::new(self.tables.next_role);
        self.tables.roles.insert(
            id,
            Role {
                id,
                name: name.to_string(),
                description: description.to_string(),
                permissions: Vec::new(),
            },
        );
        Ok(id)
    }

    fn set_role_permissions(&mut self, role: RoleId, permissions: &[PermissionId]) -> Result<()> {
        for permission in permissions {
            self.tables.ensure_permission(*permission)?;
        }
        let record = self
            .tables
            .roles
            .get_mut(&role)
            .ok_or_else(|| StoreError::not_found("role", role))?;
        record.permissions.clear();
        push_unique(&mut record.permissions, permissions);
        Ok(())
    }

    fn permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.tables.permissions.get(&id).cloned())
    }

    fn permission_by_tag(&self, tag: &PermissionTag) -> Result<Option<Permission>> {
        Ok(self
            .tables
            .permissions
            .values()
            .find(|p| &p.tag == tag)
            .cloned())
    }

    fn insert_permission(
        &mut self,
        tag: &PermissionTag,
        description: &str,
    ) -> Result<PermissionId> {
        if self.tables.permissions.values().any(|p| &p.tag == tag) {
            return Err(StoreError::Conflict(format!(
                "permission tag {tag} already exists"
            )));
        }
        self.tables.next_permission += 1;
        let id = PermissionId::new(self.tables.next_permission);
        self.tables.permissions.insert(
            id,
            Permission {
                id,
                tag: tag.clone(),
                description: description.to_string(),
            },
        );
        Ok(id)
    }

    fn clear_effective_permissions(&mut self, principal: PrincipalId) -> Result<()> {
        self.tables.live_row_mut(principal)?.effective.clear();
        Ok(())
    }

    fn append_effective_permissions(
        &mut self,
        principal: PrincipalId,
        permissions: &[PermissionId],
    ) -> Result<()> {
        for permission in permissions {
            self.tables.ensure_permission(*permission)?;
        }
        let row = self.tables.live_row_mut(principal)?;
        push_unique(&mut row.effective, permissions);
        Ok(())
    }
}

/// Process-local store for principals, roles, permissions, API keys and
/// identity profiles.
///
/// Readers always see a committed snapshot. Writers are serialized.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }

    /// Inserts a principal with no roles. Live principals' emails are unique.
    pub fn insert_principal(
        &self,
        email: &str,
        created_by: Option<PrincipalId>,
    ) -> Result<PrincipalId> {
        let mut tables = self.write()?;
        if tables
            .principals
            .values()
            .any(|row| row.deleted_at.is_none() && row.email == email)
        {
            return Err(StoreError::Conflict(format!(
                "a principal with email {email:?} already exists"
            )));
        }

        let id = PrincipalId::generate();
        tables.principals.insert(
            id,
            PrincipalRow {
                email: email.to_string(),
                display_name: None,
                roles: Vec::new(),
                effective: Vec::new(),
                created_by,
                updated_by: created_by,
                deleted_at: None,
            },
        );
        debug!(principal = %id, "principal inserted");
        Ok(id)
    }

    /// Loads a live principal from the committed snapshot.
    pub fn principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        let tables = self.read()?;
        tables
            .live_row(id)
            .map(|row| tables.materialize(id, row, None))
            .transpose()
    }

    /// Mints an API key bound to `principal`. The plaintext is returned once.
    pub fn issue_api_key(
        &self,
        principal: PrincipalId,
        name: impl Into<String>,
    ) -> Result<(ApiKeyId, ApiKey)> {
        let mut tables = self.write()?;
        if tables.live_row(principal).is_none() {
            return Err(StoreError::not_found("principal", principal));
        }

        let key = ApiKey::generate();
        tables.next_api_key += 1;
        let id = ApiKeyId::new(tables.next_api_key);
        tables.api_keys.insert(
            id,
            ApiKeyRecord {
                id,
                principal,
                name: name.into(),
                key_hash: key.hash(),
                created_at: Utc::now(),
            },
        );
        debug!(principal = %principal, api_key = %id, "API key issued");
        Ok((id, key))
    }

    /// Revokes an API key. Returns whether it existed.
    pub fn revoke_api_key(&self, id: ApiKeyId) -> Result<bool> {
        Ok(self.write()?.api_keys.remove(&id).is_some())
    }

    /// Links an external identity to a principal.
    pub fn link_identity(
        &self,
        principal: PrincipalId,
        email: &str,
        issuer: &str,
        external_subject: &str,
    ) -> Result<()> {
        let mut tables = self.write()?;
        if tables.live_row(principal).is_none() {
            return Err(StoreError::not_found("principal", principal));
        }
        if tables.profiles.iter().any(|p| {
            p.email == email && p.issuer == issuer && p.external_subject == external_subject
        }) {
            return Err(StoreError::Conflict(format!(
                "identity {issuer}/{external_subject} is already linked"
            )));
        }
        tables.profiles.push(IdentityProfile {
            principal,
            email: email.to_string(),
            issuer: issuer.to_string(),
            external_subject: external_subject.to_string(),
        });
        Ok(())
    }

    /// Marks a principal deleted and drops its identity profiles.
    ///
    /// The row is kept for audit; every lookup skips it from now on.
    pub fn tombstone(&self, principal: PrincipalId, by: Option<PrincipalId>) -> Result<()> {
        let mut tables = self.write()?;
        let row = tables.live_row_mut(principal)?;
        row.deleted_at = Some(Utc::now());
        row.updated_by = by;
        tables.profiles.retain(|p| p.principal != principal);
        warn!(principal = %principal, "principal tombstoned");
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RbacStore for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn RbacTransaction) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.write().map_err(E::from)?;
        let mut working = committed.clone();

        let mut tx = MemoryTransaction {
            tables: &mut working,
        };
        match f(&mut tx) {
            Ok(out) => {
                *committed = working;
                debug!("transaction committed");
                Ok(out)
            }
            Err(e) => {
                debug!("transaction rolled back");
                Err(e)
            }
        }
    }
}

impl PrincipalLookup for MemoryStore {
    fn find_by_api_key(&self, api_key: &str) -> Result<Option<Principal>> {
        if api_key.is_empty() {
            return Ok(None);
        }
        let key_hash = hash_api_key(api_key);
        let tables = self.read()?;

        let Some(record) = tables.api_keys.values().find(|r| r.key_hash == key_hash) else {
            return Ok(None);
        };
        tables
            .live_row(record.principal)
            .map(|row| tables.materialize(record.principal, row, Some(record.id)))
            .transpose()
    }

    fn find_by_identity(&self, identity: &IdentityRef<'_>) -> Result<Option<Principal>> {
        if identity.issuer.is_empty() || identity.subject.is_empty() {
            return Ok(None);
        }
        let tables = self.read()?;

        let principal = if identity.local {
            PrincipalId::parse(identity.subject).filter(|id| {
                tables
                    .live_row(*id)
                    .is_some_and(|row| row.email == identity.email)
            })
        } else {
            tables
                .profiles
                .iter()
                .find(|p| {
                    p.email == identity.email
                        && p.issuer == identity.issuer
                        && p.external_subject == identity.subject
                })
                .map(|p| p.principal)
        };

        principal
            .and_then(|id| tables.live_row(id).map(|row| (id, row)))
            .map(|(id, row)| tables.materialize(id, row, None))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> PermissionTag {
        PermissionTag::parse(s).unwrap()
    }

    #[test]
    fn test_commit_makes_changes_visible() {
        let store = MemoryStore::new();
        let id = store
            .transaction::<_, StoreError, _>(|tx| tx.insert_role("admin", "Administrator"))
            .unwrap();

        let role = store
            .transaction::<_, StoreError, _>(|tx| tx.role(id))
            .unwrap()
            .unwrap();
        assert_eq!(role.name, "admin");
    }

    #[test]
    fn test_error_rolls_back_every_change() {
        let store = MemoryStore::new();
        let result = store.transaction::<(), StoreError, _>(|tx| {
            tx.insert_permission(&tag("create:users"), "")?;
            tx.insert_role("admin", "")?;
            Err(StoreError::Unavailable("boom".into()))
        });
        assert!(result.is_err());

        let (permission, role) = store
            .transaction::<_, StoreError, _>(|tx| {
                Ok((
                    tx.permission_by_tag(&tag("create:users"))?,
                    tx.role_by_name("admin")?,
                ))
            })
            .unwrap();
        assert!(permission.is_none());
        assert!(role.is_none());
    }

    #[test]
    fn test_unique_keys_conflict() {
        let store = MemoryStore::new();
        let result = store.transaction::<_, StoreError, _>(|tx| {
            tx.insert_permission(&tag("read:roles"), "")?;
            tx.insert_permission(&tag("read:roles"), "")
        });
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        store.insert_principal("a@example.com", None).unwrap();
        assert!(matches!(
            store.insert_principal("a@example.com", None),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_effective_permissions_materialize_as_tags() {
        let store = MemoryStore::new();
        let principal = store.insert_principal("a@example.com", None).unwrap();

        store
            .transaction::<_, StoreError, _>(|tx| {
                let p = tx.insert_permission(&tag("list:users"), "")?;
                tx.clear_effective_permissions(principal)?;
                tx.append_effective_permissions(principal, &[p, p])
            })
            .unwrap();

        let loaded = store.principal(principal).unwrap().unwrap();
        assert_eq!(loaded.permissions.len(), 1);
        assert!(loaded.permissions.contains(&tag("list:users")));
    }

    #[test]
    fn test_api_key_lookup_and_revocation() {
        let store = MemoryStore::new();
        let principal = store.insert_principal("svc@example.com", None).unwrap();
        let (key_id, key) = store.issue_api_key(principal, "ci").unwrap();

        let found = store.find_by_api_key(key.as_str()).unwrap().unwrap();
        assert_eq!(found.id, principal);
        assert_eq!(found.api_key, Some(key_id));

        assert!(store.find_by_api_key("wk_unknown").unwrap().is_none());
        assert!(store.find_by_api_key("").unwrap().is_none());

        assert!(store.revoke_api_key(key_id).unwrap());
        assert!(store.find_by_api_key(key.as_str()).unwrap().is_none());
    }

    #[test]
    fn test_identity_lookup_local_and_external() {
        let store = MemoryStore::new();
        let principal = store.insert_principal("a@example.com", None).unwrap();
        store
            .link_identity(principal, "a@example.com", "google", "g-123")
            .unwrap();

        let local_subject = principal.to_string();
        let local = IdentityRef {
            email: "a@example.com",
            issuer: "db",
            subject: &local_subject,
            local: true,
        };
        assert_eq!(store.find_by_identity(&local).unwrap().unwrap().id, principal);

        let wrong_email = IdentityRef {
            email: "b@example.com",
            ..local
        };
        assert!(store.find_by_identity(&wrong_email).unwrap().is_none());

        let external = IdentityRef {
            email: "a@example.com",
            issuer: "google",
            subject: "g-123",
            local: false,
        };
        assert_eq!(
            store.find_by_identity(&external).unwrap().unwrap().id,
            principal
        );

        let other_provider = IdentityRef {
            issuer: "facebook",
            ..external
        };
        assert!(store.find_by_identity(&other_provider).unwrap().is_none());

        // The issuer name plays no part; only the caller's `local` flag does.
        let id_from_external = IdentityRef {
            issuer: "db",
            local: false,
            ..local
        };
        assert!(store.find_by_identity(&id_from_external).unwrap().is_none());
        let renamed_local = IdentityRef {
            issuer: "warden",
            ..local
        };
        assert_eq!(
            store.find_by_identity(&renamed_local).unwrap().unwrap().id,
            principal
        );
    }

    #[test]
    fn test_tombstoned_principals_are_invisible() {
        let store = MemoryStore::new();
        let admin = store.insert_principal("admin@example.com", None).unwrap();
        let principal = store
            .insert_principal("gone@example.com", Some(admin))
            .unwrap();
        let (_, key) = store.issue_api_key(principal, "old").unwrap();
        store
            .link_identity(principal, "gone@example.com", "google", "g-9")
            .unwrap();

        store.tombstone(principal, Some(admin)).unwrap();

        assert!(store.principal(principal).unwrap().is_none());
        let flags = store
            .transaction::<_, StoreError, _>(|tx| {
                Ok((tx.is_tombstoned(principal)?, tx.is_tombstoned(admin)?))
            })
            .unwrap();
        assert_eq!(flags, (true, false));
        assert!(store.find_by_api_key(key.as_str()).unwrap().is_none());
        let external = IdentityRef {
            email: "gone@example.com",
            issuer: "google",
            subject: "g-9",
            local: false,
        };
        assert!(store.find_by_identity(&external).unwrap().is_none());

        // The email is free again once the old row is tombstoned.
        assert!(store.insert_principal("gone@example.com", None).is_ok());
    }
}

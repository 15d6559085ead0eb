//! # warden-types: Core types for `Warden`
//!
//! This crate contains the data model shared by every warden crate:
//! - Entity IDs ([`PrincipalId`], [`RoleId`], [`PermissionId`], [`ApiKeyId`])
//! - Permission tags ([`PermissionTag`]) and sets ([`PermissionSet`])
//! - Stored records ([`Permission`], [`Role`], [`Principal`])
//! - Storage-column naming ([`to_snake_case`])
//!
//! Records here are plain values. The persistence collaborator owns the
//! canonical copies; request handling only ever holds a transient clone.

use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod naming;

pub use naming::to_snake_case;

// ============================================================================
// Entity IDs
// ============================================================================

/// Unique identifier for a principal (user or service account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses the hyphenated form produced by [`Display`].
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(u64);

impl RoleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RoleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RoleId> for u64 {
    fn from(id: RoleId) -> Self {
        id.0
    }
}

/// Unique identifier for a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionId(u64);

impl PermissionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for PermissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PermissionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<PermissionId> for u64 {
    fn from(id: PermissionId) -> Self {
        id.0
    }
}

/// Identifier of an API key bound to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiKeyId(u64);

impl ApiKeyId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ApiKeyId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Permission tags
// ============================================================================

/// Globally unique `"<action>:<entity>"` capability string, e.g. `create:users`.
///
/// The entity half is always in storage-column convention, so
/// `PermissionTag::format("create", "UserAPIKeys")` is `create:user_api_keys`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionTag(String);

impl PermissionTag {
    /// Builds the tag for an action applied to an entity.
    pub fn format(action: &str, entity: &str) -> Self {
        Self(format!("{action}:{}", to_snake_case(entity)))
    }

    /// Parses an already formatted tag.
    ///
    /// Returns `None` unless the string has exactly one `:` with a non-empty
    /// action on the left and a non-empty entity on the right.
    pub fn parse(tag: &str) -> Option<Self> {
        let (action, entity) = tag.split_once(':')?;
        if action.is_empty() || entity.is_empty() || entity.contains(':') {
            return None;
        }
        Some(Self(tag.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn action(&self) -> &str {
        self.0.split_once(':').map_or("", |(action, _)| action)
    }

    pub fn entity(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, entity)| entity)
    }

    /// Human readable description, e.g. `Allows the user to create users`.
    pub fn description(&self) -> String {
        format!("Allows the user to {}", self.0.replace(':', " "))
    }
}

impl Display for PermissionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PermissionTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("malformed permission tag: {value:?}"))
    }
}

impl From<PermissionTag> for String {
    fn from(tag: PermissionTag) -> Self {
        tag.0
    }
}

/// Set of permission tags, used for a principal's effective permissions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    tags: BTreeSet<PermissionTag>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether this set contains the given tag.
    pub fn contains(&self, tag: &PermissionTag) -> bool {
        self.tags.contains(tag)
    }

    /// Adds a tag to the set. Duplicate grants are no-ops.
    pub fn grant(&mut self, tag: PermissionTag) {
        self.tags.insert(tag);
    }

    /// Removes a tag from the set.
    pub fn revoke(&mut self, tag: &PermissionTag) {
        self.tags.remove(tag);
    }

    /// Adds every tag of `other` to this set.
    pub fn union_with(&mut self, other: &PermissionSet) {
        self.tags.extend(other.tags.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<PermissionTag> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionTag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Stored records
// ============================================================================

/// A permission record. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub tag: PermissionTag,
    pub description: String,
}

/// A role and the permissions attached to it (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub permissions: Vec<PermissionId>,
}

/// Identity resolved for a request.
///
/// `created_by` and `updated_by` are non-owning back-references: they hold
/// the other principal's id and are resolved on demand through the store,
/// never as an owned nested `Principal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: Option<String>,
    /// Roles currently assigned to this principal.
    pub roles: Vec<RoleId>,
    /// Cached effective permission set; the union of `roles`' permissions
    /// as of the last committed cascade.
    pub permissions: PermissionSet,
    /// API key this principal was resolved through, if any.
    pub api_key: Option<ApiKeyId>,
    pub created_by: Option<PrincipalId>,
    pub updated_by: Option<PrincipalId>,
    /// Tombstone. Set instead of deleting the record so audits keep it.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Creates a principal with no roles (and therefore no permissions).
    pub fn new(id: PrincipalId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: None,
            roles: Vec::new(),
            permissions: PermissionSet::empty(),
            api_key: None,
            created_by: None,
            updated_by: None,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_tag_format_normalizes_entity() {
        assert_eq!(PermissionTag::format("create", "Users").as_str(), "create:users");
        assert_eq!(
            PermissionTag::format("list", "UserAPIKeys").as_str(),
            "list:user_api_keys"
        );
        assert_eq!(
            PermissionTag::format("assign", "user_roles").as_str(),
            "assign:user_roles"
        );
    }

    #[test]
    fn test_permission_tag_parts_and_description() {
        let tag = PermissionTag::format("delete", "UserProfiles");
        assert_eq!(tag.action(), "delete");
        assert_eq!(tag.entity(), "user_profiles");
        assert_eq!(tag.description(), "Allows the user to delete user_profiles");
    }

    #[test]
    fn test_permission_tag_parse_rejects_malformed() {
        assert!(PermissionTag::parse("create:users").is_some());
        assert!(PermissionTag::parse("create").is_none());
        assert!(PermissionTag::parse(":users").is_none());
        assert!(PermissionTag::parse("create:").is_none());
        assert!(PermissionTag::parse("a:b:c").is_none());
    }

    #[test]
    fn test_permission_tag_serde_validates() {
        let tag: PermissionTag = serde_json::from_str("\"read:roles\"").unwrap();
        assert_eq!(tag.as_str(), "read:roles");
        assert!(serde_json::from_str::<PermissionTag>("\"bogus\"").is_err());
    }

    #[test]
    fn test_permission_set_operations() {
        let create = PermissionTag::format("create", "users");
        let read = PermissionTag::format("read", "users");

        let mut set = PermissionSet::empty();
        assert!(!set.contains(&create));

        set.grant(create.clone());
        set.grant(create.clone());
        assert_eq!(set.len(), 1);

        let other: PermissionSet = [read.clone()].into_iter().collect();
        set.union_with(&other);
        assert!(set.contains(&read));
        assert_eq!(set.len(), 2);

        set.revoke(&create);
        assert!(!set.contains(&create));
        assert!(set.contains(&read));
    }

    #[test]
    fn test_new_principal_is_deny_by_default() {
        let principal = Principal::new(PrincipalId::generate(), "a@example.com");
        assert!(principal.roles.is_empty());
        assert!(principal.permissions.is_empty());
        assert!(!principal.is_deleted());
    }

    #[test]
    fn test_principal_id_round_trips_through_display() {
        let id = PrincipalId::generate();
        assert_eq!(PrincipalId::parse(&id.to_string()), Some(id));
        assert_eq!(PrincipalId::parse("not-a-uuid"), None);
    }
}

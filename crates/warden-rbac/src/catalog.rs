//! Permission catalog: the explicit (action × entity) table.

use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_types::{PermissionTag, to_snake_case};

use crate::{RbacError, Result};

/// Entities that carry permissions, in declaration order.
pub const STANDARD_ENTITIES: &[&str] = &[
    "Users",
    "Roles",
    "Permissions",
    "RoleParents",
    "RolePermissions",
    "UserPermissions",
    "UserProfiles",
    "UserRoles",
    "UserAPIKeys",
    "Products",
];

/// An operation a permission can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    List,
    Assign,
    Upload,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::List,
        Action::Assign,
        Action::Upload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::List => "list",
            Action::Assign => "assign",
            Action::Upload => "upload",
        }
    }

    /// Tag template with `%s` standing for the entity, e.g. `create:%s`.
    pub fn template(self) -> String {
        format!("{}:%s", self.as_str())
    }

    /// The tag granting this action on `entity`. The entity is normalized
    /// to storage-column convention first.
    pub fn tag(self, entity: &str) -> PermissionTag {
        PermissionTag::format(self.as_str(), entity)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| RbacError::NotFound(format!("action {s:?}")))
    }
}

/// One permission the catalog declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub action: Action,
    /// Entity in storage-column convention.
    pub entity: String,
    pub tag: PermissionTag,
    pub description: String,
}

impl CatalogEntry {
    fn new(action: Action, entity: &str) -> Self {
        let tag = action.tag(entity);
        let description = tag.description();
        Self {
            action,
            entity: to_snake_case(entity),
            tag,
            description,
        }
    }
}

/// Immutable table of every permission the system knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    entries: Vec<CatalogEntry>,
}

impl PermissionCatalog {
    /// Every action applied to every entity in [`STANDARD_ENTITIES`].
    pub fn standard() -> Self {
        let entries = STANDARD_ENTITIES
            .iter()
            .flat_map(|entity| Action::ALL.map(|action| CatalogEntry::new(action, entity)))
            .collect();
        Self { entries }
    }

    /// Builds a catalog from the cross product of `actions` and `entities`.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::Conflict`] if two pairs map to the same tag,
    /// e.g. `Users` and `users`.
    pub fn new(actions: &[Action], entities: &[&str]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(actions.len() * entities.len());

        for entity in entities {
            for action in actions {
                let entry = CatalogEntry::new(*action, entity);
                if !seen.insert(entry.tag.clone()) {
                    return Err(RbacError::Conflict(format!(
                        "duplicate catalog entry {}",
                        entry.tag
                    )));
                }
                entries.push(entry);
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tag: &PermissionTag) -> bool {
        self.entries.iter().any(|e| &e.tag == tag)
    }
}

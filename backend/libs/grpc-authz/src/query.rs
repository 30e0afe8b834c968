//! Backend-neutral permission query and result shapes
//!
//! Backend adapters translate these into their own wire schemas, so the
//! decision logic never sees a backend-specific message.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PERMISSION: &str = "call";
pub const DEFAULT_RESOURCE_TYPE: &str = "rpcs";
pub const DEFAULT_SUBJECT_TYPE: &str = "users";

/// Typed reference to an object in the permission service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

/// "Does `subject` have `permission` on `resource`?"
///
/// Built fresh for every call and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionQuery {
    pub permission: String,
    pub resource: ObjectRef,
    pub subject: ObjectRef,
}

impl PermissionQuery {
    pub fn new(permission: impl Into<String>, resource: ObjectRef, subject: ObjectRef) -> Self {
        Self {
            permission: permission.into(),
            resource,
            subject,
        }
    }
}

/// Relationship notation: `resourceType:resourceId#permission@subjectType:subjectId`
impl fmt::Display for PermissionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.resource, self.permission, self.subject)
    }
}

/// Resource type and permission required to invoke a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub resource_type: String,
    pub permission: String,
}

impl PermissionRule {
    pub fn new(resource_type: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            permission: permission.into(),
        }
    }
}

impl Default for PermissionRule {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_TYPE, DEFAULT_PERMISSION)
    }
}

/// Answer from a permission service that was reached successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissionship {
    HasPermission,
    NoPermission,
    /// Permission depends on caveat context the query did not supply
    Conditional,
    Unspecified,
}

impl Permissionship {
    /// Only an unconditional grant approves a call
    pub fn is_granted(self) -> bool {
        matches!(self, Permissionship::HasPermission)
    }
}

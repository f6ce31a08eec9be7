//! Core authorization request types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation being authorized: an action performed on a resource path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Action name (e.g., "secret.read", "key.rotate")
    pub action: String,

    /// Resource path (e.g., "/kv/payments/db-password")
    pub resource: String,
}

impl Operation {
    /// Create a new operation
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.action, self.resource)
    }
}

/// Authenticated caller, as produced by an authenticator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Caller identifier
    #[serde(default)]
    pub name: String,

    /// Groups the caller belongs to, in precedence order
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserInfo {
    /// Create a user without groups
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Add a group membership
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_creation() {
        let op = Operation::new("secret.read", "/kv/payments");
        assert_eq!(op.action, "secret.read");
        assert_eq!(op.resource, "/kv/payments");
        assert_eq!(op.to_string(), "secret.read on /kv/payments");
    }

    #[test]
    fn test_user_groups_keep_order() {
        let user = UserInfo::new("alice").with_group("ops").with_group("dev");
        assert_eq!(user.groups, vec!["ops".to_string(), "dev".to_string()]);
    }
}

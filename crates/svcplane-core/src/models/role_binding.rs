//! Namespace role bindings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NamespaceRole {
    /// Full read/write, including plan visibility in the control-plane namespace.
    Admin,
    Developer,
    Auditor,
}

impl NamespaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceRole::Admin => "Admin",
            NamespaceRole::Developer => "Developer",
            NamespaceRole::Auditor => "Auditor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Admin" => Some(NamespaceRole::Admin),
            "Developer" => Some(NamespaceRole::Developer),
            "Auditor" => Some(NamespaceRole::Auditor),
            _ => None,
        }
    }

    /// Whether the role may mutate resources in its namespace.
    pub fn can_write(&self) -> bool {
        matches!(self, NamespaceRole::Admin | NamespaceRole::Developer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub namespace: String,
    pub user: String,
    pub role: NamespaceRole,
}

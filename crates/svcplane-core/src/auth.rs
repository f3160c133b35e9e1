//! Caller identity.

use serde::{Deserialize, Serialize};

/// The identity a store or broker call is made on behalf of.
///
/// User calls are subject to namespace role checks in the store. The
/// controller identity is the privileged one the broker client uses when it
/// walks reference chains across namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthInfo {
    Controller,
    User { name: String },
}

impl AuthInfo {
    pub fn user(name: impl Into<String>) -> Self {
        AuthInfo::User { name: name.into() }
    }

    /// User name for role lookups; `None` for the controller.
    pub fn user_name(&self) -> Option<&str> {
        match self {
            AuthInfo::Controller => None,
            AuthInfo::User { name } => Some(name),
        }
    }

    pub fn is_controller(&self) -> bool {
        matches!(self, AuthInfo::Controller)
    }
}

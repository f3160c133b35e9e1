//! Error types for the service plane.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaneError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Access to {entity} in namespace {namespace} is forbidden")]
    Forbidden { entity: String, namespace: String },

    #[error("Broken reference on {entity} {id}: {reason}")]
    Linkage {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("Credentials for broker {broker_id} are unusable: {reason}")]
    Credential { broker_id: String, reason: String },

    #[error("Invalid parameters on service instance {instance_id}: {reason}")]
    ParameterParse { instance_id: String, reason: String },

    #[error("Failed to parse catalog of broker {broker_id}: {reason}")]
    CatalogParse { broker_id: String, reason: String },

    #[error("Failed to parse binding response for {binding_id}: {reason}")]
    BindingParse { binding_id: String, reason: String },

    #[error("Failed to parse last operation response for {id}: {reason}")]
    LastOperationParse { id: String, reason: String },

    #[error("Broker request returned non-OK status {status}: {body}")]
    BrokerRequestFailed { status: u16, body: String },

    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Gave up updating {entity} {id} after {attempts} conflicting writes")]
    ConflictExhausted {
        entity: String,
        id: String,
        attempts: u32,
    },

    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Duplicate {entity} records exist")]
    Duplicate { entity: String },

    #[error("Invalid stored {entity} {id}: {reason}")]
    Invariant {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaneError {
    /// Whether the failure is transient from the caller's point of view.
    ///
    /// Broker 5xx responses, transport failures and lost optimistic races
    /// may succeed on a later attempt; everything else needs a change in
    /// stored state or configuration first.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlaneError::BrokerRequestFailed { status, .. } => *status >= 500,
            PlaneError::Transport(_)
            | PlaneError::Conflict { .. }
            | PlaneError::ConflictExhausted { .. }
            | PlaneError::Cancelled { .. } => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlaneError::NotFound { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, PlaneError::Forbidden { .. })
    }
}

pub type PlaneResult<T> = Result<T, PlaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_server_errors_are_retryable() {
        let err = PlaneError::BrokerRequestFailed {
            status: 503,
            body: "busy".into(),
        };
        assert!(err.is_retryable());

        let err = PlaneError::BrokerRequestFailed {
            status: 422,
            body: "bad plan".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn linkage_errors_are_permanent() {
        let err = PlaneError::Linkage {
            entity: "service_plan".into(),
            id: "p1".into(),
            reason: "no broker reference".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("p1"));
    }
}

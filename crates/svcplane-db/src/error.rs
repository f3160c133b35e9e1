//! Database-specific error types and conversions.

use svcplane_core::error::PlaneError;
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),
}

impl From<DbError> for PlaneError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PlaneError::NotFound { entity, id },
            other => PlaneError::Database(other.to_string()),
        }
    }
}

impl DbError {
    /// The store aborted the transaction because a concurrent transaction
    /// committed a write to the same record first.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            DbError::Surreal(e) => is_transaction_conflict(&e.to_string()),
            _ => false,
        }
    }
}

fn is_transaction_conflict(message: &str) -> bool {
    message.contains("Transaction conflict") || message.contains("retry the transaction")
}

/// Error of a conditional write. An aborted conflicting transaction is a
/// lost race, reported like a stale version.
pub(crate) fn write_error(err: DbError, entity: &str, id: Uuid) -> PlaneError {
    if err.is_write_conflict() {
        tracing::debug!(entity, %id, "Write aborted by a concurrent transaction");
        return PlaneError::Conflict {
            entity: entity.into(),
            id: id.to_string(),
        };
    }
    err.into()
}

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    field: &str,
) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::Decode(format!("invalid {field}: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T, field: &str) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|e| DbError::Decode(format!("cannot encode {field}: {e}")))
}

//! Service broker domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An external service broker reachable over the OSB protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBroker {
    pub id: Uuid,
    /// Namespace holding the broker and its credentials secret.
    pub namespace: String,
    pub name: String,
    /// Base URL the OSB paths are joined onto.
    pub url: String,
    /// Name of the secret (in `namespace`) with `username`/`password` keys.
    pub credentials_secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceBroker {
    pub namespace: String,
    pub name: String,
    pub url: String,
    pub credentials_secret: String,
}

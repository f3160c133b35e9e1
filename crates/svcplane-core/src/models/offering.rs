//! Service offering domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry published by exactly one broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub namespace: String,
    pub name: String,
    pub description: String,
    /// Identifier the broker assigned in its catalog (`service_id` on the wire).
    pub broker_catalog_id: String,
    pub broker_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceOffering {
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub broker_catalog_id: String,
    pub broker_id: Uuid,
}

//! Service binding domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub id: Uuid,
    /// Tenant namespace; the referenced instance lives in the same namespace.
    pub namespace: String,
    pub name: Option<String>,
    pub instance_id: Uuid,
    pub app_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceBinding {
    pub namespace: String,
    pub name: Option<String>,
    pub instance_id: Uuid,
    pub app_id: Option<Uuid>,
}

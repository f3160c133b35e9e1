//! Service instance domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: Uuid,
    /// Tenant namespace owning the instance.
    pub namespace: String,
    pub name: String,
    pub plan_id: Uuid,
    /// Raw JSON provisioning parameters, forwarded to the broker as-is.
    pub parameters: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceInstance {
    pub namespace: String,
    pub name: String,
    pub plan_id: Uuid,
    pub parameters: Option<String>,
}

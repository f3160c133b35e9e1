//! Process domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckData {
    pub http_endpoint: String,
    pub invocation_timeout_secs: i64,
    pub timeout_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// `process`, `port` or `http`.
    pub check_type: String,
    pub data: HealthCheckData,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            check_type: "port".into(),
            data: HealthCheckData::default(),
        }
    }
}

/// A process of an app, stored in the app's tenant namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: Uuid,
    pub namespace: String,
    pub app_id: Uuid,
    pub process_type: String,
    pub command: String,
    /// Command detected from the droplet, used when `command` is empty.
    pub detected_command: String,
    /// Defaulted on admission; `None` here means the store is inconsistent.
    pub desired_instances: Option<i64>,
    pub memory_mb: i64,
    pub disk_quota_mb: i64,
    pub health_check: HealthCheck,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resource_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProcess {
    pub namespace: String,
    pub app_id: Uuid,
    pub process_type: String,
    pub command: String,
    pub detected_command: String,
    pub desired_instances: Option<i64>,
    pub memory_mb: i64,
    pub disk_quota_mb: i64,
    pub health_check: HealthCheck,
}

//! Service plan domain model.
//!
//! Plans are synchronized from broker catalogs and are read-only here,
//! except for their [`PlanVisibility`], which decides which tenants may
//! see the plan in the marketplace.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visibility classification of a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VisibilityType {
    /// Visible to every organization.
    #[serde(rename = "public")]
    Public,
    /// Visible only to control-plane administrators.
    #[serde(rename = "admin")]
    ControlPlaneOnly,
    /// Visible to the organizations on the plan's allow-list.
    #[serde(rename = "organization")]
    Organizations,
}

impl VisibilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityType::Public => "public",
            VisibilityType::ControlPlaneOnly => "admin",
            VisibilityType::Organizations => "organization",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(VisibilityType::Public),
            "admin" => Some(VisibilityType::ControlPlaneOnly),
            "organization" => Some(VisibilityType::Organizations),
            _ => None,
        }
    }
}

/// Stored visibility of a plan: a type plus an organization allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanVisibility {
    pub visibility_type: VisibilityType,
    /// De-duplicated, in first-seen order.
    pub organizations: Vec<Uuid>,
}

impl PlanVisibility {
    pub fn new(visibility_type: VisibilityType) -> Self {
        Self {
            visibility_type,
            organizations: Vec::new(),
        }
    }
}

impl Default for PlanVisibility {
    fn default() -> Self {
        Self::new(VisibilityType::ControlPlaneOnly)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatures {
    pub plan_updateable: bool,
    pub bindable: bool,
}

/// What the broker published about the plan in its catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBrokerCatalog {
    /// Broker-assigned plan identifier (`plan_id` on the wire).
    pub id: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub features: PlanFeatures,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputParameterSchema {
    /// JSON Schema describing accepted parameters.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstanceSchema {
    #[serde(default)]
    pub create: InputParameterSchema,
    #[serde(default)]
    pub update: InputParameterSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBindingSchema {
    #[serde(default)]
    pub create: InputParameterSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlanSchemas {
    #[serde(default)]
    pub service_instance: ServiceInstanceSchema,
    #[serde(default)]
    pub service_binding: ServiceBindingSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceInfo {
    pub version: String,
}

/// Typed back-reference to the offering a plan belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingRef {
    pub id: Uuid,
    pub name: String,
}

/// Typed back-reference to the broker publishing a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: Uuid,
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub free: bool,
    pub broker_catalog: PlanBrokerCatalog,
    pub schemas: ServicePlanSchemas,
    pub maintenance_info: MaintenanceInfo,
    pub visibility: PlanVisibility,
    /// `None` when catalog synchronization left the plan unlinked.
    pub offering: Option<OfferingRef>,
    pub broker: Option<BrokerRef>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resource_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServicePlan {
    /// Plans restricted to the control plane are not available to tenants.
    pub fn is_available(&self) -> bool {
        self.visibility.visibility_type != VisibilityType::ControlPlaneOnly
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServicePlan {
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub free: bool,
    pub broker_catalog: PlanBrokerCatalog,
    pub schemas: ServicePlanSchemas,
    pub maintenance_info: MaintenanceInfo,
    pub visibility: PlanVisibility,
    pub offering: Option<OfferingRef>,
    pub broker: Option<BrokerRef>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_type_wire_names() {
        for t in [
            VisibilityType::Public,
            VisibilityType::ControlPlaneOnly,
            VisibilityType::Organizations,
        ] {
            assert_eq!(VisibilityType::parse(t.as_str()), Some(t));
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().into()));
        }
        assert_eq!(VisibilityType::parse("space"), None);
    }
}

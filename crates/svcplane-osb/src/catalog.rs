//! OSB wire types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use svcplane_core::models::plan::ServicePlanSchemas;

/// Response of `GET /v2/catalog`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub services: Vec<CatalogService>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogService {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub instances_retrievable: bool,
    pub bindings_retrievable: bool,
    pub plan_updateable: bool,
    pub allow_context_updates: bool,
    pub tags: Vec<String>,
    pub requires: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub dashboard_client: DashboardClient,
    pub plans: Vec<CatalogPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardClient {
    pub id: String,
    pub secret: String,
    #[serde(rename = "redirect_url")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub free: bool,
    pub bindable: bool,
    pub binding_rotatable: bool,
    pub plan_updateable: bool,
    pub schemas: ServicePlanSchemas,
}

/// Response of `GET .../service_bindings/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingResponse {
    #[serde(default)]
    pub credentials: BTreeMap<String, serde_json::Value>,
}

/// State of the most recent asynchronous operation on an instance or
/// binding. `exists == false` means the broker no longer knows about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastOperation {
    pub exists: bool,
    pub state: String,
    pub description: String,
}

impl LastOperation {
    pub fn gone() -> Self {
        Self::default()
    }
}

/// Body of a `last_operation` response.
#[derive(Debug, Deserialize)]
pub(crate) struct LastOperationBody {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<LastOperationBody> for LastOperation {
    fn from(body: LastOperationBody) -> Self {
        Self {
            exists: true,
            state: body.state.unwrap_or_default(),
            description: body.description.unwrap_or_default(),
        }
    }
}

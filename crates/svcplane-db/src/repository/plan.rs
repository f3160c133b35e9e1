//! SurrealDB implementation of [`ServicePlanRepository`].
//!
//! Visibility is stored flat (`visibility_type` plus an array of
//! organization ids) and written back with a `resource_version` guard.

use chrono::{DateTime, Utc};
use svcplane_core::auth::AuthInfo;
use svcplane_core::error::{PlaneError, PlaneResult};
use svcplane_core::models::plan::{
    BrokerRef, CreateServicePlan, MaintenanceInfo, OfferingRef, PlanVisibility, ServicePlan,
    VisibilityType,
};
use svcplane_core::repository::ServicePlanRepository;
use svcplane_core::store::VersionedRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{VersionRow, string_map};
use crate::access::{ensure_admin, ensure_can_read};
use crate::error::{DbError, from_json, parse_uuid, to_json, write_error};

const ENTITY: &str = "service_plan";

#[derive(Debug, SurrealValue)]
struct PlanRow {
    record_id: String,
    namespace: String,
    name: String,
    description: String,
    free: bool,
    broker_catalog: serde_json::Value,
    schemas: serde_json::Value,
    maintenance_version: String,
    visibility_type: String,
    visibility_organizations: Vec<String>,
    offering_id: Option<String>,
    offering_name: Option<String>,
    broker_id: Option<String>,
    broker_name: Option<String>,
    labels: serde_json::Value,
    annotations: serde_json::Value,
    resource_version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlanRow {
    fn try_into_plan(self) -> Result<ServicePlan, DbError> {
        let visibility_type = VisibilityType::parse(&self.visibility_type).ok_or_else(|| {
            DbError::Decode(format!("unknown visibility type: {}", self.visibility_type))
        })?;
        let organizations = self
            .visibility_organizations
            .iter()
            .map(|raw| parse_uuid(raw, "organization"))
            .collect::<Result<Vec<_>, _>>()?;

        let offering = match (self.offering_id, self.offering_name) {
            (Some(id), Some(name)) => Some(OfferingRef {
                id: parse_uuid(&id, "offering")?,
                name,
            }),
            _ => None,
        };
        let broker = match (self.broker_id, self.broker_name) {
            (Some(id), Some(name)) => Some(BrokerRef {
                id: parse_uuid(&id, "broker")?,
                name,
            }),
            _ => None,
        };

        Ok(ServicePlan {
            id: parse_uuid(&self.record_id, "plan")?,
            namespace: self.namespace,
            name: self.name,
            description: self.description,
            free: self.free,
            broker_catalog: from_json(self.broker_catalog, "broker_catalog")?,
            schemas: from_json(self.schemas, "schemas")?,
            maintenance_info: MaintenanceInfo {
                version: self.maintenance_version,
            },
            visibility: PlanVisibility {
                visibility_type,
                organizations,
            },
            offering,
            broker,
            labels: string_map(self.labels, "labels")?,
            annotations: string_map(self.annotations, "annotations")?,
            resource_version: self.resource_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn organization_strings(visibility: &PlanVisibility) -> Vec<String> {
    visibility
        .organizations
        .iter()
        .map(Uuid::to_string)
        .collect()
}

#[derive(Clone)]
pub struct SurrealServicePlanRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServicePlanRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn load(&self, namespace: &str, id: Uuid) -> Result<Option<ServicePlan>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('service_plan', $id) \
                 WHERE namespace = $namespace",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let rows: Vec<PlanRow> = result.take(0)?;
        rows.into_iter().next().map(PlanRow::try_into_plan).transpose()
    }

    async fn load_existing(&self, namespace: &str, id: Uuid) -> Result<ServicePlan, DbError> {
        self.load(namespace, id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id.to_string(),
            })
    }
}

impl<C: Connection> VersionedRepository<ServicePlan> for SurrealServicePlanRepository<C> {
    async fn fetch(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<ServicePlan> {
        ServicePlanRepository::get(self, auth, namespace, id).await
    }

    async fn write_if_unchanged(&self, auth: &AuthInfo, value: ServicePlan) -> PlaneResult<ServicePlan> {
        ensure_admin(&self.db, auth, ENTITY, &value.namespace).await?;

        let labels = to_json(&value.labels, "labels")?;
        let annotations = to_json(&value.annotations, "annotations")?;

        let mut result = self
            .db
            .query(
                "UPDATE type::record('service_plan', $id) SET \
                 visibility_type = $visibility_type, \
                 visibility_organizations = $visibility_organizations, \
                 labels = $labels, annotations = $annotations, \
                 resource_version = resource_version + 1, \
                 updated_at = time::now() \
                 WHERE namespace = $namespace \
                 AND resource_version = $expected_version",
            )
            .bind(("id", value.id.to_string()))
            .bind(("namespace", value.namespace.clone()))
            .bind(("visibility_type", value.visibility.visibility_type.as_str()))
            .bind(("visibility_organizations", organization_strings(&value.visibility)))
            .bind(("labels", labels))
            .bind(("annotations", annotations))
            .bind(("expected_version", value.resource_version))
            .await
            .map_err(|e| write_error(e.into(), ENTITY, value.id))?;

        let written: Vec<VersionRow> = result
            .take(0)
            .map_err(|e| write_error(e.into(), ENTITY, value.id))?;
        if written.is_empty() {
            // Either the record is gone or someone else bumped the version.
            self.load_existing(&value.namespace, value.id).await?;
            debug!(id = %value.id, expected = value.resource_version, "Plan version moved");
            return Err(PlaneError::Conflict {
                entity: ENTITY.into(),
                id: value.id.to_string(),
            });
        }

        Ok(self.load_existing(&value.namespace, value.id).await?)
    }
}

impl<C: Connection> ServicePlanRepository for SurrealServicePlanRepository<C> {
    async fn create(&self, input: CreateServicePlan) -> PlaneResult<ServicePlan> {
        let id = Uuid::new_v4();

        let broker_catalog = to_json(&input.broker_catalog, "broker_catalog")?;
        let schemas = to_json(&input.schemas, "schemas")?;
        let labels = to_json(&input.labels, "labels")?;
        let annotations = to_json(&input.annotations, "annotations")?;

        self.db
            .query(
                "CREATE type::record('service_plan', $id) SET \
                 namespace = $namespace, name = $name, \
                 description = $description, free = $free, \
                 broker_catalog = $broker_catalog, schemas = $schemas, \
                 maintenance_version = $maintenance_version, \
                 visibility_type = $visibility_type, \
                 visibility_organizations = $visibility_organizations, \
                 offering_id = $offering_id, offering_name = $offering_name, \
                 broker_id = $broker_id, broker_name = $broker_name, \
                 labels = $labels, annotations = $annotations",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", input.namespace.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("free", input.free))
            .bind(("broker_catalog", broker_catalog))
            .bind(("schemas", schemas))
            .bind(("maintenance_version", input.maintenance_info.version))
            .bind(("visibility_type", input.visibility.visibility_type.as_str()))
            .bind(("visibility_organizations", organization_strings(&input.visibility)))
            .bind(("offering_id", input.offering.as_ref().map(|o| o.id.to_string())))
            .bind(("offering_name", input.offering.map(|o| o.name)))
            .bind(("broker_id", input.broker.as_ref().map(|b| b.id.to_string())))
            .bind(("broker_name", input.broker.map(|b| b.name)))
            .bind(("labels", labels))
            .bind(("annotations", annotations))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.load_existing(&input.namespace, id).await?)
    }

    async fn get(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<ServicePlan> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.load_existing(namespace, id).await?)
    }

    async fn list(&self, auth: &AuthInfo, namespace: &str) -> PlaneResult<Vec<ServicePlan>> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service_plan \
                 WHERE namespace = $namespace ORDER BY created_at ASC",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PlanRow> = result.take(0).map_err(DbError::from)?;
        let plans = rows
            .into_iter()
            .map(PlanRow::try_into_plan)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    async fn delete(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<()> {
        ensure_admin(&self.db, auth, ENTITY, namespace).await?;
        self.load_existing(namespace, id).await?;

        self.db
            .query("DELETE type::record('service_plan', $id) WHERE namespace = $namespace")
            .bind(("id", id.to_string()))
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}

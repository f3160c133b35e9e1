//! SurrealDB implementation of [`ServiceInstanceRepository`].

use chrono::{DateTime, Utc};
use svcplane_core::auth::AuthInfo;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::instance::{CreateServiceInstance, ServiceInstance};
use svcplane_core::repository::ServiceInstanceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::access::ensure_can_read;
use crate::error::{DbError, parse_uuid};

const ENTITY: &str = "service_instance";

#[derive(Debug, SurrealValue)]
struct InstanceRow {
    record_id: String,
    namespace: String,
    name: String,
    plan_id: String,
    parameters: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InstanceRow {
    fn try_into_instance(self) -> Result<ServiceInstance, DbError> {
        Ok(ServiceInstance {
            id: parse_uuid(&self.record_id, "instance")?,
            namespace: self.namespace,
            name: self.name,
            plan_id: parse_uuid(&self.plan_id, "plan")?,
            parameters: self.parameters,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealServiceInstanceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceInstanceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, namespace: &str, id: Uuid) -> Result<ServiceInstance, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('service_instance', $id) \
                 WHERE namespace = $namespace",
            )
            .bind(("id", id_str.clone()))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let rows: Vec<InstanceRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            })?
            .try_into_instance()
    }
}

impl<C: Connection> ServiceInstanceRepository for SurrealServiceInstanceRepository<C> {
    async fn create(&self, input: CreateServiceInstance) -> PlaneResult<ServiceInstance> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('service_instance', $id) SET \
                 namespace = $namespace, name = $name, \
                 plan_id = $plan_id, parameters = $parameters",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", input.namespace.clone()))
            .bind(("name", input.name))
            .bind(("plan_id", input.plan_id.to_string()))
            .bind(("parameters", input.parameters))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.fetch(&input.namespace, id).await?)
    }

    async fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> PlaneResult<ServiceInstance> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.fetch(namespace, id).await?)
    }

    async fn list(&self, auth: &AuthInfo, namespace: &str) -> PlaneResult<Vec<ServiceInstance>> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service_instance \
                 WHERE namespace = $namespace ORDER BY name ASC",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstanceRow> = result.take(0).map_err(DbError::from)?;
        let instances = rows
            .into_iter()
            .map(InstanceRow::try_into_instance)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(instances)
    }
}

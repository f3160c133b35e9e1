//! SurrealDB implementation of [`ServiceOfferingRepository`].

use chrono::{DateTime, Utc};
use svcplane_core::auth::AuthInfo;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::offering::{CreateServiceOffering, ServiceOffering};
use svcplane_core::repository::ServiceOfferingRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::access::ensure_can_read;
use crate::error::{DbError, parse_uuid};

const ENTITY: &str = "service_offering";

#[derive(Debug, SurrealValue)]
struct OfferingRow {
    record_id: String,
    namespace: String,
    name: String,
    description: String,
    broker_catalog_id: String,
    broker_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfferingRow {
    fn try_into_offering(self) -> Result<ServiceOffering, DbError> {
        Ok(ServiceOffering {
            id: parse_uuid(&self.record_id, "offering")?,
            namespace: self.namespace,
            name: self.name,
            description: self.description,
            broker_catalog_id: self.broker_catalog_id,
            broker_id: parse_uuid(&self.broker_id, "broker")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealServiceOfferingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceOfferingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, namespace: &str, id: Uuid) -> Result<ServiceOffering, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('service_offering', $id) \
                 WHERE namespace = $namespace",
            )
            .bind(("id", id_str.clone()))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let rows: Vec<OfferingRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            })?
            .try_into_offering()
    }
}

impl<C: Connection> ServiceOfferingRepository for SurrealServiceOfferingRepository<C> {
    async fn create(&self, input: CreateServiceOffering) -> PlaneResult<ServiceOffering> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('service_offering', $id) SET \
                 namespace = $namespace, name = $name, \
                 description = $description, \
                 broker_catalog_id = $broker_catalog_id, \
                 broker_id = $broker_id",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", input.namespace.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("broker_catalog_id", input.broker_catalog_id))
            .bind(("broker_id", input.broker_id.to_string()))
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
    ) -> PlaneResult<ServiceOffering> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.fetch(namespace, id).await?)
    }

    async fn list(&self, auth: &AuthInfo, namespace: &str) -> PlaneResult<Vec<ServiceOffering>> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service_offering \
                 WHERE namespace = $namespace ORDER BY name ASC",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OfferingRow> = result.take(0).map_err(DbError::from)?;
        let offerings = rows
            .into_iter()
            .map(OfferingRow::try_into_offering)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(offerings)
    }
}

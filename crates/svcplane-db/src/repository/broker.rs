//! SurrealDB implementation of [`ServiceBrokerRepository`].

use chrono::{DateTime, Utc};
use svcplane_core::auth::AuthInfo;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::broker::{CreateServiceBroker, ServiceBroker};
use svcplane_core::repository::ServiceBrokerRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::access::ensure_can_read;
use crate::error::{DbError, parse_uuid};

const ENTITY: &str = "service_broker";

#[derive(Debug, SurrealValue)]
struct BrokerRow {
    record_id: String,
    namespace: String,
    name: String,
    url: String,
    credentials_secret: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BrokerRow {
    fn try_into_broker(self) -> Result<ServiceBroker, DbError> {
        Ok(ServiceBroker {
            id: parse_uuid(&self.record_id, "broker")?,
            namespace: self.namespace,
            name: self.name,
            url: self.url,
            credentials_secret: self.credentials_secret,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealServiceBrokerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceBrokerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, namespace: &str, id: Uuid) -> Result<ServiceBroker, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('service_broker', $id) \
                 WHERE namespace = $namespace",
            )
            .bind(("id", id_str.clone()))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let rows: Vec<BrokerRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            })?
            .try_into_broker()
    }
}

impl<C: Connection> ServiceBrokerRepository for SurrealServiceBrokerRepository<C> {
    async fn create(&self, input: CreateServiceBroker) -> PlaneResult<ServiceBroker> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('service_broker', $id) SET \
                 namespace = $namespace, name = $name, url = $url, \
                 credentials_secret = $credentials_secret",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", input.namespace.clone()))
            .bind(("name", input.name))
            .bind(("url", input.url))
            .bind(("credentials_secret", input.credentials_secret))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.fetch(&input.namespace, id).await?)
    }

    async fn get(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<ServiceBroker> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.fetch(namespace, id).await?)
    }

    async fn list(&self, auth: &AuthInfo, namespace: &str) -> PlaneResult<Vec<ServiceBroker>> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service_broker \
                 WHERE namespace = $namespace ORDER BY name ASC",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BrokerRow> = result.take(0).map_err(DbError::from)?;
        let brokers = rows
            .into_iter()
            .map(BrokerRow::try_into_broker)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(brokers)
    }
}

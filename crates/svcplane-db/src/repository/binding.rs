//! SurrealDB implementation of [`ServiceBindingRepository`].

use chrono::{DateTime, Utc};
use svcplane_core::auth::AuthInfo;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::binding::{CreateServiceBinding, ServiceBinding};
use svcplane_core::repository::ServiceBindingRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::access::ensure_can_read;
use crate::error::{DbError, parse_uuid};

const ENTITY: &str = "service_binding";

#[derive(Debug, SurrealValue)]
struct BindingRow {
    record_id: String,
    namespace: String,
    name: Option<String>,
    instance_id: String,
    app_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BindingRow {
    fn try_into_binding(self) -> Result<ServiceBinding, DbError> {
        let app_id = self
            .app_id
            .as_deref()
            .map(|raw| parse_uuid(raw, "app"))
            .transpose()?;
        Ok(ServiceBinding {
            id: parse_uuid(&self.record_id, "binding")?,
            namespace: self.namespace,
            name: self.name,
            instance_id: parse_uuid(&self.instance_id, "instance")?,
            app_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealServiceBindingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceBindingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, namespace: &str, id: Uuid) -> Result<ServiceBinding, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('service_binding', $id) \
                 WHERE namespace = $namespace",
            )
            .bind(("id", id_str.clone()))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let rows: Vec<BindingRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            })?
            .try_into_binding()
    }
}

impl<C: Connection> ServiceBindingRepository for SurrealServiceBindingRepository<C> {
    async fn create(&self, input: CreateServiceBinding) -> PlaneResult<ServiceBinding> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('service_binding', $id) SET \
                 namespace = $namespace, name = $name, \
                 instance_id = $instance_id, app_id = $app_id",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", input.namespace.clone()))
            .bind(("name", input.name))
            .bind(("instance_id", input.instance_id.to_string()))
            .bind(("app_id", input.app_id.map(|a| a.to_string())))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.fetch(&input.namespace, id).await?)
    }

    async fn get(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<ServiceBinding> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.fetch(namespace, id).await?)
    }
}

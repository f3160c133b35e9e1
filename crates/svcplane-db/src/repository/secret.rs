//! SurrealDB implementation of [`SecretRepository`].

use svcplane_core::auth::AuthInfo;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::secret::{CreateSecret, Secret};
use svcplane_core::repository::SecretRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::string_map;
use crate::access::ensure_can_read;
use crate::error::{DbError, to_json};

const ENTITY: &str = "secret";

#[derive(Debug, SurrealValue)]
struct SecretRow {
    namespace: String,
    name: String,
    data: serde_json::Value,
}

impl SecretRow {
    fn try_into_secret(self) -> Result<Secret, DbError> {
        Ok(Secret {
            namespace: self.namespace,
            name: self.name,
            data: string_map(self.data, "secret data")?,
        })
    }
}

#[derive(Clone)]
pub struct SurrealSecretRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSecretRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn load(&self, namespace: &str, name: &str) -> Result<Secret, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM secret \
                 WHERE namespace = $namespace AND name = $name LIMIT 1",
            )
            .bind(("namespace", namespace.to_string()))
            .bind(("name", name.to_string()))
            .await?;

        let rows: Vec<SecretRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: format!("{namespace}/{name}"),
            })?
            .try_into_secret()
    }
}

impl<C: Connection> SecretRepository for SurrealSecretRepository<C> {
    async fn create(&self, input: CreateSecret) -> PlaneResult<Secret> {
        let data = to_json(&input.data, "secret data")?;

        self.db
            .query(
                "CREATE secret SET \
                 namespace = $namespace, name = $name, data = $data",
            )
            .bind(("namespace", input.namespace.clone()))
            .bind(("name", input.name.clone()))
            .bind(("data", data))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.load(&input.namespace, &input.name).await?)
    }

    async fn get(&self, auth: &AuthInfo, namespace: &str, name: &str) -> PlaneResult<Secret> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.load(namespace, name).await?)
    }
}

//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use svcplane_core::error::PlaneResult;
use svcplane_core::models::organization::{
    CreateOrganization, Organization, VisibilityOrganization,
};
use svcplane_core::repository::OrganizationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    record_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid(&self.record_id, "organization")?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct NameRow {
    record_id: String,
    name: String,
}

#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> PlaneResult<Organization> {
        let id = Uuid::new_v4();

        self.db
            .query("CREATE type::record('organization', $id) SET name = $name")
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get(id).await
    }

    async fn get(&self, id: Uuid) -> PlaneResult<Organization> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('organization', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;
        Ok(row.try_into_organization()?)
    }

    async fn list_visibility_organizations(
        &self,
        ids: &[Uuid],
    ) -> PlaneResult<Vec<VisibilityOrganization>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids_str: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, name FROM organization \
                 WHERE meta::id(id) IN $ids",
            )
            .bind(("ids", ids_str))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NameRow> = result.take(0).map_err(DbError::from)?;
        let mut found = Vec::with_capacity(rows.len());
        for row in rows {
            found.push(VisibilityOrganization {
                id: parse_uuid(&row.record_id, "organization")?,
                name: row.name,
            });
        }

        // Keep the caller's ordering.
        let ordered = ids
            .iter()
            .filter_map(|id| found.iter().find(|o| o.id == *id).cloned())
            .collect();
        Ok(ordered)
    }
}

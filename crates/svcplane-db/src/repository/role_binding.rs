//! SurrealDB implementation of [`RoleBindingRepository`] and
//! [`NamespacePermissions`].

use svcplane_core::auth::AuthInfo;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::role_binding::{NamespaceRole, RoleBinding};
use svcplane_core::repository::{NamespacePermissions, RoleBindingRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleBindingRow {
    namespace: String,
    user: String,
    role: String,
}

impl RoleBindingRow {
    fn try_into_binding(self) -> Result<RoleBinding, DbError> {
        let role = NamespaceRole::parse(&self.role)
            .ok_or_else(|| DbError::Decode(format!("unknown role: {}", self.role)))?;
        Ok(RoleBinding {
            namespace: self.namespace,
            user: self.user,
            role,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct NamespaceRow {
    namespace: String,
}

#[derive(Clone)]
pub struct SurrealRoleBindingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleBindingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleBindingRepository for SurrealRoleBindingRepository<C> {
    async fn create(&self, input: RoleBinding) -> PlaneResult<RoleBinding> {
        self.db
            .query(
                "CREATE role_binding SET \
                 namespace = $namespace, user = $user, role = $role",
            )
            .bind(("namespace", input.namespace.clone()))
            .bind(("user", input.user.clone()))
            .bind(("role", input.role.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(
            namespace = %input.namespace,
            user = %input.user,
            role = input.role.as_str(),
            "Role bound"
        );
        Ok(input)
    }

    async fn delete(&self, input: RoleBinding) -> PlaneResult<()> {
        self.db
            .query(
                "DELETE role_binding WHERE namespace = $namespace \
                 AND user = $user AND role = $role",
            )
            .bind(("namespace", input.namespace))
            .bind(("user", input.user))
            .bind(("role", input.role.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn list_for_user(&self, user: &str) -> PlaneResult<Vec<RoleBinding>> {
        let mut result = self
            .db
            .query(
                "SELECT namespace, user, role FROM role_binding \
                 WHERE user = $user ORDER BY namespace ASC",
            )
            .bind(("user", user.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleBindingRow> = result.take(0).map_err(DbError::from)?;
        let bindings = rows
            .into_iter()
            .map(RoleBindingRow::try_into_binding)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bindings)
    }
}

impl<C: Connection> NamespacePermissions for SurrealRoleBindingRepository<C> {
    /// Every namespace where the user holds any role. The controller sees
    /// every namespace that has at least one binding.
    async fn authorized_namespaces(&self, auth: &AuthInfo) -> PlaneResult<Vec<String>> {
        let mut result = match auth.user_name() {
            Some(user) => self
                .db
                .query(
                    "SELECT namespace FROM role_binding \
                     WHERE user = $user GROUP BY namespace",
                )
                .bind(("user", user.to_string()))
                .await
                .map_err(DbError::from)?,
            None => self
                .db
                .query("SELECT namespace FROM role_binding GROUP BY namespace")
                .await
                .map_err(DbError::from)?,
        };

        let rows: Vec<NamespaceRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.namespace).collect())
    }
}

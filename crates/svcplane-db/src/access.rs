//! Namespace role checks backed by the `role_binding` table.

use svcplane_core::auth::AuthInfo;
use svcplane_core::error::{PlaneError, PlaneResult};
use svcplane_core::models::role_binding::NamespaceRole;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    role: String,
}

/// Roles `user` holds in `namespace`. Unknown role names are skipped.
pub(crate) async fn roles_in<C: Connection>(
    db: &Surreal<C>,
    user: &str,
    namespace: &str,
) -> Result<Vec<NamespaceRole>, DbError> {
    let mut result = db
        .query(
            "SELECT role FROM role_binding \
             WHERE namespace = $namespace AND user = $user",
        )
        .bind(("namespace", namespace.to_string()))
        .bind(("user", user.to_string()))
        .await?;

    let rows: Vec<RoleRow> = result.take(0)?;
    Ok(rows
        .iter()
        .filter_map(|r| NamespaceRole::parse(&r.role))
        .collect())
}

async fn ensure<C, P>(
    db: &Surreal<C>,
    auth: &AuthInfo,
    entity: &str,
    namespace: &str,
    allowed: P,
) -> PlaneResult<()>
where
    C: Connection,
    P: Fn(&NamespaceRole) -> bool,
{
    let Some(user) = auth.user_name() else {
        return Ok(());
    };

    let roles = roles_in(db, user, namespace).await?;
    if roles.iter().any(allowed) {
        return Ok(());
    }

    debug!(user, namespace, entity, "Namespace access denied");
    Err(PlaneError::Forbidden {
        entity: entity.into(),
        namespace: namespace.into(),
    })
}

/// Any role in the namespace grants read access.
pub(crate) async fn ensure_can_read<C: Connection>(
    db: &Surreal<C>,
    auth: &AuthInfo,
    entity: &str,
    namespace: &str,
) -> PlaneResult<()> {
    ensure(db, auth, entity, namespace, |_| true).await
}

/// Admin and Developer roles may mutate resources.
pub(crate) async fn ensure_can_write<C: Connection>(
    db: &Surreal<C>,
    auth: &AuthInfo,
    entity: &str,
    namespace: &str,
) -> PlaneResult<()> {
    ensure(db, auth, entity, namespace, NamespaceRole::can_write).await
}

/// Only Admin may mutate control-plane catalog records.
pub(crate) async fn ensure_admin<C: Connection>(
    db: &Surreal<C>,
    auth: &AuthInfo,
    entity: &str,
    namespace: &str,
) -> PlaneResult<()> {
    ensure(db, auth, entity, namespace, |r| *r == NamespaceRole::Admin).await
}

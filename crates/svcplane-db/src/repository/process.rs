//! SurrealDB implementation of [`ProcessRepository`].

use chrono::{DateTime, Utc};
use svcplane_core::auth::AuthInfo;
use svcplane_core::error::{PlaneError, PlaneResult};
use svcplane_core::models::process::{CreateProcess, Process};
use svcplane_core::repository::ProcessRepository;
use svcplane_core::store::VersionedRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{VersionRow, string_map};
use crate::access::{ensure_can_read, ensure_can_write};
use crate::error::{DbError, from_json, parse_uuid, to_json, write_error};

const ENTITY: &str = "process";

#[derive(Debug, SurrealValue)]
struct ProcessRow {
    record_id: String,
    namespace: String,
    app_id: String,
    process_type: String,
    command: String,
    detected_command: String,
    desired_instances: Option<i64>,
    memory_mb: i64,
    disk_quota_mb: i64,
    health_check: serde_json::Value,
    labels: serde_json::Value,
    annotations: serde_json::Value,
    resource_version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProcessRow {
    fn try_into_process(self) -> Result<Process, DbError> {
        Ok(Process {
            id: parse_uuid(&self.record_id, "process")?,
            namespace: self.namespace,
            app_id: parse_uuid(&self.app_id, "app")?,
            process_type: self.process_type,
            command: self.command,
            detected_command: self.detected_command,
            desired_instances: self.desired_instances,
            memory_mb: self.memory_mb,
            disk_quota_mb: self.disk_quota_mb,
            health_check: from_json(self.health_check, "health_check")?,
            labels: string_map(self.labels, "labels")?,
            annotations: string_map(self.annotations, "annotations")?,
            resource_version: self.resource_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealProcessRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProcessRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn load(&self, namespace: &str, id: Uuid) -> Result<Process, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('process', $id) \
                 WHERE namespace = $namespace",
            )
            .bind(("id", id_str.clone()))
            .bind(("namespace", namespace.to_string()))
            .await?;

        let rows: Vec<ProcessRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            })?
            .try_into_process()
    }
}

impl<C: Connection> VersionedRepository<Process> for SurrealProcessRepository<C> {
    async fn fetch(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<Process> {
        ProcessRepository::get(self, auth, namespace, id).await
    }

    async fn write_if_unchanged(&self, auth: &AuthInfo, value: Process) -> PlaneResult<Process> {
        ensure_can_write(&self.db, auth, ENTITY, &value.namespace).await?;

        let health_check = to_json(&value.health_check, "health_check")?;
        let labels = to_json(&value.labels, "labels")?;
        let annotations = to_json(&value.annotations, "annotations")?;

        let mut result = self
            .db
            .query(
                "UPDATE type::record('process', $id) SET \
                 command = $command, \
                 desired_instances = $desired_instances, \
                 memory_mb = $memory_mb, disk_quota_mb = $disk_quota_mb, \
                 health_check = $health_check, \
                 labels = $labels, annotations = $annotations, \
                 resource_version = resource_version + 1, \
                 updated_at = time::now() \
                 WHERE namespace = $namespace \
                 AND resource_version = $expected_version",
            )
            .bind(("id", value.id.to_string()))
            .bind(("namespace", value.namespace.clone()))
            .bind(("command", value.command))
            .bind(("desired_instances", value.desired_instances))
            .bind(("memory_mb", value.memory_mb))
            .bind(("disk_quota_mb", value.disk_quota_mb))
            .bind(("health_check", health_check))
            .bind(("labels", labels))
            .bind(("annotations", annotations))
            .bind(("expected_version", value.resource_version))
            .await
            .map_err(|e| write_error(e.into(), ENTITY, value.id))?;

        let written: Vec<VersionRow> = result
            .take(0)
            .map_err(|e| write_error(e.into(), ENTITY, value.id))?;
        if written.is_empty() {
            self.load(&value.namespace, value.id).await?;
            debug!(id = %value.id, expected = value.resource_version, "Process version moved");
            return Err(PlaneError::Conflict {
                entity: ENTITY.into(),
                id: value.id.to_string(),
            });
        }

        Ok(self.load(&value.namespace, value.id).await?)
    }
}

impl<C: Connection> ProcessRepository for SurrealProcessRepository<C> {
    async fn create(&self, input: CreateProcess) -> PlaneResult<Process> {
        let id = Uuid::new_v4();
        let health_check = to_json(&input.health_check, "health_check")?;

        self.db
            .query(
                "CREATE type::record('process', $id) SET \
                 namespace = $namespace, app_id = $app_id, \
                 process_type = $process_type, command = $command, \
                 detected_command = $detected_command, \
                 desired_instances = $desired_instances, \
                 memory_mb = $memory_mb, disk_quota_mb = $disk_quota_mb, \
                 health_check = $health_check",
            )
            .bind(("id", id.to_string()))
            .bind(("namespace", input.namespace.clone()))
            .bind(("app_id", input.app_id.to_string()))
            .bind(("process_type", input.process_type))
            .bind(("command", input.command))
            .bind(("detected_command", input.detected_command))
            .bind(("desired_instances", input.desired_instances))
            .bind(("memory_mb", input.memory_mb))
            .bind(("disk_quota_mb", input.disk_quota_mb))
            .bind(("health_check", health_check))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.load(&input.namespace, id).await?)
    }

    async fn get(&self, auth: &AuthInfo, namespace: &str, id: Uuid) -> PlaneResult<Process> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;
        Ok(self.load(namespace, id).await?)
    }

    async fn list(&self, auth: &AuthInfo, namespace: &str) -> PlaneResult<Vec<Process>> {
        ensure_can_read(&self.db, auth, ENTITY, namespace).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM process \
                 WHERE namespace = $namespace ORDER BY created_at ASC",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProcessRow> = result.take(0).map_err(DbError::from)?;
        let processes = rows
            .into_iter()
            .map(ProcessRow::try_into_process)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(processes)
    }
}

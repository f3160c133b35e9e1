//! Process listing, lookup and scaling.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use svcplane_core::auth::AuthInfo;
use svcplane_core::context::RequestContext;
use svcplane_core::error::{PlaneError, PlaneResult};
use svcplane_core::models::process::{HealthCheck, Process};
use svcplane_core::predicate::Predicate;
use svcplane_core::repository::{NamespacePermissions, ProcessRepository};
use svcplane_core::store::patch_with_retry;
use tracing::info;
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::lister::ScatterGatherLister;

/// API-facing projection of a stored process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub id: Uuid,
    pub namespace: String,
    pub app_id: Uuid,
    pub process_type: String,
    pub command: String,
    pub desired_instances: i64,
    pub memory_mb: i64,
    pub disk_quota_mb: i64,
    pub health_check: HealthCheck,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Process> for ProcessRecord {
    type Error = PlaneError;

    fn try_from(process: Process) -> PlaneResult<Self> {
        let desired_instances = process.desired_instances.ok_or_else(|| PlaneError::Invariant {
            entity: "process".into(),
            id: process.id.to_string(),
            reason: "desired instances not set".into(),
        })?;

        let command = if process.command.is_empty() {
            process.detected_command
        } else {
            process.command
        };

        Ok(Self {
            id: process.id,
            namespace: process.namespace,
            app_id: process.app_id,
            process_type: process.process_type,
            command,
            desired_instances,
            memory_mb: process.memory_mb,
            disk_quota_mb: process.disk_quota_mb,
            health_check: process.health_check,
            labels: process.labels,
            annotations: process.annotations,
            created_at: process.created_at,
            updated_at: process.updated_at,
        })
    }
}

/// Filters for [`ProcessService::list`]. Empty lists and `None` match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct ListProcessesMessage {
    pub app_ids: Vec<Uuid>,
    pub process_types: Vec<String>,
    pub namespace: Option<String>,
}

impl ListProcessesMessage {
    fn predicate(&self) -> Predicate<Process> {
        Predicate::<Process>::new()
            .one_of("app_id", &self.app_ids, |p| Some(p.app_id.to_string()))
            .one_of("process_type", &self.process_types, |p| {
                Some(p.process_type.clone())
            })
    }

    fn namespace_filter(&self) -> Vec<String> {
        self.namespace.iter().cloned().collect()
    }
}

/// Scale request. Absent fields are left unchanged.
#[derive(Debug, Clone)]
pub struct ScaleProcessMessage {
    pub id: Uuid,
    pub namespace: String,
    pub instances: Option<i64>,
    pub memory_mb: Option<i64>,
    pub disk_mb: Option<i64>,
}

impl ScaleProcessMessage {
    fn apply(&self, mut process: Process) -> Process {
        if let Some(instances) = self.instances {
            process.desired_instances = Some(instances);
        }
        if let Some(memory_mb) = self.memory_mb {
            process.memory_mb = memory_mb;
        }
        if let Some(disk_mb) = self.disk_mb {
            process.disk_quota_mb = disk_mb;
        }
        process
    }
}

pub struct ProcessService<R, N> {
    processes: R,
    lister: ScatterGatherLister<N>,
    config: AccessConfig,
}

impl<R: ProcessRepository, N: NamespacePermissions> ProcessService<R, N> {
    pub fn new(processes: R, permissions: N, config: AccessConfig) -> Self {
        let lister =
            ScatterGatherLister::new(permissions, config.max_concurrent_namespace_queries);
        Self {
            processes,
            lister,
            config,
        }
    }

    /// Processes across every namespace the caller may read.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        message: &ListProcessesMessage,
    ) -> PlaneResult<Vec<ProcessRecord>> {
        let processes = &self.processes;
        let matched = self
            .lister
            .list(
                ctx,
                auth,
                &message.namespace_filter(),
                &message.predicate(),
                |namespace| async move { processes.list(auth, &namespace).await },
            )
            .await?;

        matched.into_iter().map(ProcessRecord::try_from).collect()
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> PlaneResult<ProcessRecord> {
        let process = ctx.run(self.processes.get(auth, namespace, id)).await?;
        ProcessRecord::try_from(process)
    }

    /// The single process of `process_type` for `app_id` in `namespace`.
    pub async fn get_by_app_type_and_namespace(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        app_id: Uuid,
        process_type: &str,
        namespace: &str,
    ) -> PlaneResult<ProcessRecord> {
        let message = ListProcessesMessage {
            app_ids: vec![app_id],
            process_types: vec![process_type.to_string()],
            namespace: Some(namespace.to_string()),
        };

        let mut matched = self.list(ctx, auth, &message).await?;
        match matched.len() {
            0 => Err(PlaneError::NotFound {
                entity: "process".into(),
                id: format!("{app_id}/{process_type}"),
            }),
            1 => Ok(matched.remove(0)),
            _ => Err(PlaneError::Duplicate {
                entity: "process".into(),
            }),
        }
    }

    /// Patch instance count and resource limits with optimistic retries.
    pub async fn scale(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        message: &ScaleProcessMessage,
    ) -> PlaneResult<ProcessRecord> {
        let scaled = patch_with_retry(
            ctx,
            &self.processes,
            auth,
            &message.namespace,
            message.id,
            self.config.max_patch_attempts,
            |process| message.apply(process),
        )
        .await?;

        info!(
            process_id = %scaled.id,
            namespace = %scaled.namespace,
            instances = ?scaled.desired_instances,
            memory_mb = scaled.memory_mb,
            disk_quota_mb = scaled.disk_quota_mb,
            "Process scaled"
        );

        ProcessRecord::try_from(scaled)
    }
}

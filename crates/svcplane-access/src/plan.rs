//! Plan listing and the plan visibility operations.
//!
//! Plans live in the control-plane namespace. Visibility mutations run the
//! pure transforms from [`svcplane_core::visibility`] inside an optimistic
//! read-modify-write and answer with the re-resolved record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use svcplane_core::auth::AuthInfo;
use svcplane_core::context::RequestContext;
use svcplane_core::error::PlaneResult;
use svcplane_core::models::organization::VisibilityOrganization;
use svcplane_core::models::plan::{
    MaintenanceInfo, PlanBrokerCatalog, ServicePlan, ServicePlanSchemas, VisibilityType,
};
use svcplane_core::predicate::Predicate;
use svcplane_core::repository::{OrganizationRepository, ServicePlanRepository};
use svcplane_core::store::patch_with_retry;
use svcplane_core::visibility;
use tracing::info;
use uuid::Uuid;

use crate::config::AccessConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanVisibilityRecord {
    pub visibility_type: VisibilityType,
    pub organizations: Vec<VisibilityOrganization>,
}

/// API-facing projection of a stored plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub free: bool,
    pub broker_catalog: PlanBrokerCatalog,
    pub schemas: ServicePlanSchemas,
    pub maintenance_info: MaintenanceInfo,
    pub visibility: PlanVisibilityRecord,
    pub offering_id: Option<Uuid>,
    pub available: bool,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanRecord {
    /// Project `plan` with its already-resolved visibility organizations.
    pub fn new(plan: ServicePlan, organizations: Vec<VisibilityOrganization>) -> Self {
        let available = plan.is_available();
        Self {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            free: plan.free,
            broker_catalog: plan.broker_catalog,
            schemas: plan.schemas,
            maintenance_info: plan.maintenance_info,
            visibility: PlanVisibilityRecord {
                visibility_type: plan.visibility.visibility_type,
                organizations,
            },
            offering_id: plan.offering.map(|o| o.id),
            available,
            labels: plan.labels,
            annotations: plan.annotations,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}

/// Filters for [`PlanService::list`]. Empty lists and `None` match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct ListPlansMessage {
    pub ids: Vec<Uuid>,
    pub names: Vec<String>,
    pub offering_ids: Vec<Uuid>,
    pub offering_names: Vec<String>,
    pub broker_ids: Vec<Uuid>,
    pub broker_names: Vec<String>,
    pub available: Option<bool>,
}

impl ListPlansMessage {
    fn predicate(&self) -> Predicate<ServicePlan> {
        Predicate::<ServicePlan>::new()
            .one_of("id", &self.ids, |p| Some(p.id.to_string()))
            .one_of("name", &self.names, |p| Some(p.name.clone()))
            .one_of("offering_id", &self.offering_ids, |p| {
                p.offering.as_ref().map(|o| o.id.to_string())
            })
            .one_of("offering_name", &self.offering_names, |p| {
                p.offering.as_ref().map(|o| o.name.clone())
            })
            .one_of("broker_id", &self.broker_ids, |p| {
                p.broker.as_ref().map(|b| b.id.to_string())
            })
            .one_of("broker_name", &self.broker_names, |p| {
                p.broker.as_ref().map(|b| b.name.clone())
            })
            .equals("available", self.available, ServicePlan::is_available)
    }
}

/// Target of a visibility mutation.
#[derive(Debug, Clone)]
pub struct PlanVisibilityMessage {
    pub plan_id: Uuid,
    pub visibility_type: VisibilityType,
    pub organizations: Vec<Uuid>,
}

pub struct PlanService<P, G> {
    plans: P,
    organizations: G,
    config: AccessConfig,
}

impl<P: ServicePlanRepository, G: OrganizationRepository> PlanService<P, G> {
    pub fn new(plans: P, organizations: G, config: AccessConfig) -> Self {
        Self {
            plans,
            organizations,
            config,
        }
    }

    fn namespace(&self) -> &str {
        &self.config.control_plane_namespace
    }

    async fn to_record(&self, ctx: &RequestContext, plan: ServicePlan) -> PlaneResult<PlanRecord> {
        let ids = visibility::effective_organizations(&plan.visibility);
        let organizations = if ids.is_empty() {
            Vec::new()
        } else {
            ctx.run(self.organizations.list_visibility_organizations(ids))
                .await?
        };
        Ok(PlanRecord::new(plan, organizations))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        message: &ListPlansMessage,
    ) -> PlaneResult<Vec<PlanRecord>> {
        let plans = ctx.run(self.plans.list(auth, self.namespace())).await?;
        let matched = message.predicate().filter(plans);

        let mut records = Vec::with_capacity(matched.len());
        for plan in matched {
            records.push(self.to_record(ctx, plan).await?);
        }
        Ok(records)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        plan_id: Uuid,
    ) -> PlaneResult<PlanRecord> {
        let plan = ctx
            .run(self.plans.get(auth, self.namespace(), plan_id))
            .await?;
        self.to_record(ctx, plan).await
    }

    /// Set the type and add organizations to the allow-list. Any type other
    /// than `Organizations` clears the list.
    pub async fn apply_visibility(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        message: &PlanVisibilityMessage,
    ) -> PlaneResult<PlanRecord> {
        let plan = self
            .patch_visibility(ctx, auth, message.plan_id, |mut plan| {
                plan.visibility = visibility::apply(
                    plan.visibility,
                    message.visibility_type,
                    &message.organizations,
                );
                plan
            })
            .await?;

        info!(
            plan_id = %plan.id,
            visibility_type = plan.visibility.visibility_type.as_str(),
            organizations = plan.visibility.organizations.len(),
            "Plan visibility applied"
        );
        self.to_record(ctx, plan).await
    }

    /// Set the type and replace the allow-list with the given
    /// organizations.
    pub async fn update_visibility(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        message: &PlanVisibilityMessage,
    ) -> PlaneResult<PlanRecord> {
        let plan = self
            .patch_visibility(ctx, auth, message.plan_id, |mut plan| {
                plan.visibility = visibility::replace(
                    plan.visibility,
                    message.visibility_type,
                    &message.organizations,
                );
                plan
            })
            .await?;

        info!(
            plan_id = %plan.id,
            visibility_type = plan.visibility.visibility_type.as_str(),
            organizations = plan.visibility.organizations.len(),
            "Plan visibility replaced"
        );
        self.to_record(ctx, plan).await
    }

    /// Remove one organization from the allow-list.
    pub async fn delete_visibility_organization(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        plan_id: Uuid,
        organization_id: Uuid,
    ) -> PlaneResult<PlanRecord> {
        let plan = self
            .patch_visibility(ctx, auth, plan_id, |mut plan| {
                plan.visibility = visibility::remove_organization(plan.visibility, organization_id);
                plan
            })
            .await?;

        info!(
            plan_id = %plan.id,
            organization_id = %organization_id,
            "Organization removed from plan visibility"
        );
        self.to_record(ctx, plan).await
    }

    pub async fn delete_plan(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        plan_id: Uuid,
    ) -> PlaneResult<()> {
        ctx.run(self.plans.delete(auth, self.namespace(), plan_id))
            .await?;
        info!(plan_id = %plan_id, "Plan deleted");
        Ok(())
    }

    async fn patch_visibility<F>(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        plan_id: Uuid,
        mutate: F,
    ) -> PlaneResult<ServicePlan>
    where
        F: Fn(ServicePlan) -> ServicePlan,
    {
        patch_with_retry(
            ctx,
            &self.plans,
            auth,
            self.namespace(),
            plan_id,
            self.config.max_patch_attempts,
            mutate,
        )
        .await
    }
}

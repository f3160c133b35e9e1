//! Credential and reference resolution.
//!
//! Walks binding → instance → plan → offering/broker → credentials.
//! Bindings and instances are read from their tenant namespace; plans,
//! offerings and brokers from the control-plane namespace. All reads use
//! the controller identity.

use std::fmt;

use svcplane_core::auth::AuthInfo;
use svcplane_core::context::RequestContext;
use svcplane_core::error::{PlaneError, PlaneResult};
use svcplane_core::models::binding::ServiceBinding;
use svcplane_core::models::broker::ServiceBroker;
use svcplane_core::models::instance::ServiceInstance;
use svcplane_core::models::offering::ServiceOffering;
use svcplane_core::models::plan::ServicePlan;
use svcplane_core::repository::{
    SecretRepository, ServiceBrokerRepository, ServiceInstanceRepository,
    ServiceOfferingRepository, ServicePlanRepository,
};
use tracing::debug;

const USERNAME_KEY: &str = "username";
const PASSWORD_KEY: &str = "password";

/// Basic auth credentials read from a broker's secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to the broker behind an instance.
#[derive(Debug, Clone)]
pub struct ResolvedInstance {
    pub broker: ServiceBroker,
    pub plan: ServicePlan,
    pub offering: ServiceOffering,
}

/// Everything needed to talk to the broker behind a binding.
#[derive(Debug, Clone)]
pub struct ResolvedBinding {
    pub instance: ServiceInstance,
    pub broker: ServiceBroker,
    pub plan: ServicePlan,
    pub offering: ServiceOffering,
}

/// The store views the resolver reads from.
#[derive(Debug, Clone)]
pub struct ResolverStores<I, P, O, B, S> {
    pub instances: I,
    pub plans: P,
    pub offerings: O,
    pub brokers: B,
    pub secrets: S,
}

pub struct ReferenceResolver<I, P, O, B, S> {
    stores: ResolverStores<I, P, O, B, S>,
    control_plane_namespace: String,
}

impl<I, P, O, B, S> ReferenceResolver<I, P, O, B, S>
where
    I: ServiceInstanceRepository,
    P: ServicePlanRepository,
    O: ServiceOfferingRepository,
    B: ServiceBrokerRepository,
    S: SecretRepository,
{
    pub fn new(stores: ResolverStores<I, P, O, B, S>, control_plane_namespace: impl Into<String>) -> Self {
        Self {
            stores,
            control_plane_namespace: control_plane_namespace.into(),
        }
    }

    pub fn control_plane_namespace(&self) -> &str {
        &self.control_plane_namespace
    }

    /// Plan referenced by an instance.
    pub async fn plan_for_instance(
        &self,
        ctx: &RequestContext,
        instance: &ServiceInstance,
    ) -> PlaneResult<ServicePlan> {
        ctx.run(self.stores.plans.get(
            &AuthInfo::Controller,
            &self.control_plane_namespace,
            instance.plan_id,
        ))
        .await
    }

    /// Offering a plan belongs to.
    pub async fn offering_for_plan(
        &self,
        ctx: &RequestContext,
        plan: &ServicePlan,
    ) -> PlaneResult<ServiceOffering> {
        let offering = plan.offering.as_ref().ok_or_else(|| PlaneError::Linkage {
            entity: "service_plan".into(),
            id: plan.id.to_string(),
            reason: "plan has no offering reference".into(),
        })?;

        ctx.run(self.stores.offerings.get(
            &AuthInfo::Controller,
            &self.control_plane_namespace,
            offering.id,
        ))
        .await
    }

    /// Broker publishing a plan.
    pub async fn broker_for_plan(
        &self,
        ctx: &RequestContext,
        plan: &ServicePlan,
    ) -> PlaneResult<ServiceBroker> {
        let broker = plan.broker.as_ref().ok_or_else(|| PlaneError::Linkage {
            entity: "service_plan".into(),
            id: plan.id.to_string(),
            reason: "plan has no broker reference".into(),
        })?;

        ctx.run(self.stores.brokers.get(
            &AuthInfo::Controller,
            &self.control_plane_namespace,
            broker.id,
        ))
        .await
    }

    /// Instance a binding refers to, looked up in the binding's namespace.
    pub async fn instance_for_binding(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> PlaneResult<ServiceInstance> {
        ctx.run(self.stores.instances.get(
            &AuthInfo::Controller,
            &binding.namespace,
            binding.instance_id,
        ))
        .await
    }

    pub async fn resolve_for_instance(
        &self,
        ctx: &RequestContext,
        instance: &ServiceInstance,
    ) -> PlaneResult<ResolvedInstance> {
        let plan = self.plan_for_instance(ctx, instance).await?;
        let offering = self.offering_for_plan(ctx, &plan).await?;
        let broker = self.broker_for_plan(ctx, &plan).await?;

        debug!(
            instance_id = %instance.id,
            plan_id = %plan.id,
            broker = %broker.name,
            "Resolved instance broker"
        );
        Ok(ResolvedInstance {
            broker,
            plan,
            offering,
        })
    }

    pub async fn resolve_for_binding(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> PlaneResult<ResolvedBinding> {
        let instance = self.instance_for_binding(ctx, binding).await?;
        let ResolvedInstance {
            broker,
            plan,
            offering,
        } = self.resolve_for_instance(ctx, &instance).await?;

        Ok(ResolvedBinding {
            instance,
            broker,
            plan,
            offering,
        })
    }

    /// Load the broker's Basic auth credentials from the secret named on
    /// the broker, in the broker's own namespace.
    pub async fn credentials(
        &self,
        ctx: &RequestContext,
        broker: &ServiceBroker,
    ) -> PlaneResult<BrokerCredentials> {
        let secret = ctx
            .run(self.stores.secrets.get(
                &AuthInfo::Controller,
                &broker.namespace,
                &broker.credentials_secret,
            ))
            .await
            .map_err(|e| match e {
                PlaneError::NotFound { .. } => PlaneError::Credential {
                    broker_id: broker.id.to_string(),
                    reason: format!("secret {:?} not found", broker.credentials_secret),
                },
                other => other,
            })?;

        let field = |key: &str| {
            secret
                .data
                .get(key)
                .cloned()
                .ok_or_else(|| PlaneError::Credential {
                    broker_id: broker.id.to_string(),
                    reason: format!(
                        "secret {:?} has no {key:?} key",
                        broker.credentials_secret
                    ),
                })
        };

        Ok(BrokerCredentials {
            username: field(USERNAME_KEY)?,
            password: field(PASSWORD_KEY)?,
        })
    }
}

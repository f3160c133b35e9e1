//! Service broker protocol client.
//!
//! Every mutating call is flagged `accepts_incomplete` and returns once
//! the broker accepts it. Status reads tolerate 404, which brokers use
//! once they have forgotten a finished operation. Polling and retries
//! belong to the caller.

use std::future::Future;

use reqwest::Method;
use serde_json::json;
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
use tracing::info;

use crate::catalog::{BindingResponse, Catalog, LastOperation, LastOperationBody};
use crate::config::OsbConfig;
use crate::requester::{BrokerRequest, BrokerResponse, RequestExecutor};
use crate::resolver::{ReferenceResolver, ResolverStores};

const V2: &str = "v2";
const SERVICE_INSTANCES: &str = "service_instances";
const SERVICE_BINDINGS: &str = "service_bindings";
const LAST_OPERATION: &str = "last_operation";

/// The broker operations a reconciler drives.
pub trait ServiceBrokerClient: Send + Sync {
    fn get_catalog(
        &self,
        ctx: &RequestContext,
        broker: &ServiceBroker,
    ) -> impl Future<Output = PlaneResult<Catalog>> + Send;

    fn provision_instance(
        &self,
        ctx: &RequestContext,
        instance: &ServiceInstance,
    ) -> impl Future<Output = PlaneResult<()>> + Send;

    fn get_instance_last_operation(
        &self,
        ctx: &RequestContext,
        instance: &ServiceInstance,
    ) -> impl Future<Output = PlaneResult<LastOperation>> + Send;

    fn deprovision_instance(
        &self,
        ctx: &RequestContext,
        instance: &ServiceInstance,
    ) -> impl Future<Output = PlaneResult<()>> + Send;

    fn bind_service(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> impl Future<Output = PlaneResult<()>> + Send;

    fn get_service_binding(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> impl Future<Output = PlaneResult<BindingResponse>> + Send;

    fn get_binding_last_operation(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> impl Future<Output = PlaneResult<LastOperation>> + Send;

    fn unbind_service(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> impl Future<Output = PlaneResult<()>> + Send;
}

/// [`ServiceBrokerClient`] backed by the store and a shared HTTP client.
pub struct OsbClient<I, P, O, B, S> {
    resolver: ReferenceResolver<I, P, O, B, S>,
    executor: RequestExecutor,
}

impl<I, P, O, B, S> OsbClient<I, P, O, B, S>
where
    I: ServiceInstanceRepository,
    P: ServicePlanRepository,
    O: ServiceOfferingRepository,
    B: ServiceBrokerRepository,
    S: SecretRepository,
{
    pub fn new(stores: ResolverStores<I, P, O, B, S>, config: &OsbConfig) -> PlaneResult<Self> {
        Ok(Self {
            resolver: ReferenceResolver::new(stores, config.control_plane_namespace.clone()),
            executor: RequestExecutor::new(config)?,
        })
    }

    pub fn resolver(&self) -> &ReferenceResolver<I, P, O, B, S> {
        &self.resolver
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        broker: &ServiceBroker,
        request: BrokerRequest,
    ) -> PlaneResult<BrokerResponse> {
        let credentials = self.resolver.credentials(ctx, broker).await?;
        self.executor
            .send(ctx, &broker.url, &credentials, request)
            .await
    }

    async fn last_operation(
        &self,
        ctx: &RequestContext,
        broker: &ServiceBroker,
        segments: &[&str],
        id: String,
    ) -> PlaneResult<LastOperation> {
        let request = BrokerRequest::new(Method::GET, segments).allow_not_found();
        let response = self.send(ctx, broker, request).await?;
        if response.is_not_found() {
            return Ok(LastOperation::gone());
        }

        let body: LastOperationBody =
            serde_json::from_slice(&response.body).map_err(|e| PlaneError::LastOperationParse {
                id,
                reason: e.to_string(),
            })?;
        Ok(body.into())
    }
}

/// `{service_id, plan_id}` identifying the catalog entry on the broker.
fn catalog_ids(offering: &ServiceOffering, plan: &ServicePlan) -> serde_json::Map<String, serde_json::Value> {
    let mut body = serde_json::Map::new();
    body.insert("service_id".into(), json!(offering.broker_catalog_id));
    body.insert("plan_id".into(), json!(plan.broker_catalog.id));
    body
}

fn instance_parameters(
    instance: &ServiceInstance,
) -> PlaneResult<Option<serde_json::Map<String, serde_json::Value>>> {
    let Some(raw) = instance.parameters.as_deref() else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| PlaneError::ParameterParse {
            instance_id: instance.id.to_string(),
            reason: e.to_string(),
        })
}

impl<I, P, O, B, S> ServiceBrokerClient for OsbClient<I, P, O, B, S>
where
    I: ServiceInstanceRepository,
    P: ServicePlanRepository,
    O: ServiceOfferingRepository,
    B: ServiceBrokerRepository,
    S: SecretRepository,
{
    async fn get_catalog(&self, ctx: &RequestContext, broker: &ServiceBroker) -> PlaneResult<Catalog> {
        let request = BrokerRequest::new(Method::GET, &[V2, "catalog"]);
        let response = self.send(ctx, broker, request).await?;

        serde_json::from_slice(&response.body).map_err(|e| PlaneError::CatalogParse {
            broker_id: broker.id.to_string(),
            reason: e.to_string(),
        })
    }

    async fn provision_instance(&self, ctx: &RequestContext, instance: &ServiceInstance) -> PlaneResult<()> {
        let resolved = self.resolver.resolve_for_instance(ctx, instance).await?;

        let mut body = catalog_ids(&resolved.offering, &resolved.plan);
        if let Some(parameters) = instance_parameters(instance)? {
            body.insert("parameters".into(), serde_json::Value::Object(parameters));
        }

        let id = instance.id.to_string();
        let request = BrokerRequest::new(Method::PUT, &[V2, SERVICE_INSTANCES, &id])
            .with_body(serde_json::Value::Object(body))
            .asynchronous();
        self.send(ctx, &resolved.broker, request).await?;

        info!(instance_id = %instance.id, broker = %resolved.broker.name, "Provision accepted");
        Ok(())
    }

    async fn get_instance_last_operation(
        &self,
        ctx: &RequestContext,
        instance: &ServiceInstance,
    ) -> PlaneResult<LastOperation> {
        let plan = self.resolver.plan_for_instance(ctx, instance).await?;
        let broker = self.resolver.broker_for_plan(ctx, &plan).await?;

        let id = instance.id.to_string();
        self.last_operation(ctx, &broker, &[V2, SERVICE_INSTANCES, &id, LAST_OPERATION], id.clone())
            .await
    }

    async fn deprovision_instance(&self, ctx: &RequestContext, instance: &ServiceInstance) -> PlaneResult<()> {
        let plan = self.resolver.plan_for_instance(ctx, instance).await?;
        let broker = self.resolver.broker_for_plan(ctx, &plan).await?;

        let id = instance.id.to_string();
        let request = BrokerRequest::new(Method::DELETE, &[V2, SERVICE_INSTANCES, &id]).asynchronous();
        self.send(ctx, &broker, request).await?;

        info!(instance_id = %instance.id, broker = %broker.name, "Deprovision accepted");
        Ok(())
    }

    async fn bind_service(&self, ctx: &RequestContext, binding: &ServiceBinding) -> PlaneResult<()> {
        let resolved = self.resolver.resolve_for_binding(ctx, binding).await?;

        let instance_id = resolved.instance.id.to_string();
        let binding_id = binding.id.to_string();
        let request = BrokerRequest::new(
            Method::PUT,
            &[V2, SERVICE_INSTANCES, &instance_id, SERVICE_BINDINGS, &binding_id],
        )
        .with_body(serde_json::Value::Object(catalog_ids(&resolved.offering, &resolved.plan)))
        .asynchronous();
        self.send(ctx, &resolved.broker, request).await?;

        info!(binding_id = %binding.id, broker = %resolved.broker.name, "Bind accepted");
        Ok(())
    }

    async fn get_service_binding(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> PlaneResult<BindingResponse> {
        let resolved = self.resolver.resolve_for_binding(ctx, binding).await?;

        let instance_id = resolved.instance.id.to_string();
        let binding_id = binding.id.to_string();
        let request = BrokerRequest::new(
            Method::GET,
            &[V2, SERVICE_INSTANCES, &instance_id, SERVICE_BINDINGS, &binding_id],
        )
        .with_body(serde_json::Value::Object(catalog_ids(&resolved.offering, &resolved.plan)));
        let response = self.send(ctx, &resolved.broker, request).await?;

        serde_json::from_slice(&response.body).map_err(|e| PlaneError::BindingParse {
            binding_id,
            reason: e.to_string(),
        })
    }

    async fn get_binding_last_operation(
        &self,
        ctx: &RequestContext,
        binding: &ServiceBinding,
    ) -> PlaneResult<LastOperation> {
        let instance = self.resolver.instance_for_binding(ctx, binding).await?;
        let plan = self.resolver.plan_for_instance(ctx, &instance).await?;
        let broker = self.resolver.broker_for_plan(ctx, &plan).await?;

        let instance_id = instance.id.to_string();
        let binding_id = binding.id.to_string();
        self.last_operation(
            ctx,
            &broker,
            &[
                V2,
                SERVICE_INSTANCES,
                &instance_id,
                SERVICE_BINDINGS,
                &binding_id,
                LAST_OPERATION,
            ],
            binding_id.clone(),
        )
        .await
    }

    async fn unbind_service(&self, ctx: &RequestContext, binding: &ServiceBinding) -> PlaneResult<()> {
        let instance = self.resolver.instance_for_binding(ctx, binding).await?;
        let plan = self.resolver.plan_for_instance(ctx, &instance).await?;
        let broker = self.resolver.broker_for_plan(ctx, &plan).await?;

        let instance_id = instance.id.to_string();
        let binding_id = binding.id.to_string();
        let request = BrokerRequest::new(
            Method::DELETE,
            &[V2, SERVICE_INSTANCES, &instance_id, SERVICE_BINDINGS, &binding_id],
        )
        .asynchronous();
        self.send(ctx, &broker, request).await?;

        info!(binding_id = %binding.id, broker = %broker.name, "Unbind accepted");
        Ok(())
    }
}

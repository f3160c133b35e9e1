//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Reads and writes take the caller's
//! [`AuthInfo`]; implementations enforce namespace access and answer with
//! [`PlaneError::Forbidden`](crate::error::PlaneError::Forbidden) when the
//! caller holds no role in the namespace.

use std::future::Future;

use uuid::Uuid;

use crate::auth::AuthInfo;
use crate::error::PlaneResult;
use crate::models::{
    binding::{CreateServiceBinding, ServiceBinding},
    broker::{CreateServiceBroker, ServiceBroker},
    instance::{CreateServiceInstance, ServiceInstance},
    offering::{CreateServiceOffering, ServiceOffering},
    organization::{CreateOrganization, Organization, VisibilityOrganization},
    plan::{CreateServicePlan, ServicePlan},
    process::{CreateProcess, Process},
    role_binding::RoleBinding,
    secret::{CreateSecret, Secret},
};
use crate::store::VersionedRepository;

// ---------------------------------------------------------------------------
// Control-plane namespace: brokers, offerings, plans
// ---------------------------------------------------------------------------

pub trait ServiceBrokerRepository: Send + Sync {
    fn create(
        &self,
        input: CreateServiceBroker,
    ) -> impl Future<Output = PlaneResult<ServiceBroker>> + Send;
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<ServiceBroker>> + Send;
    fn list(
        &self,
        auth: &AuthInfo,
        namespace: &str,
    ) -> impl Future<Output = PlaneResult<Vec<ServiceBroker>>> + Send;
}

pub trait ServiceOfferingRepository: Send + Sync {
    fn create(
        &self,
        input: CreateServiceOffering,
    ) -> impl Future<Output = PlaneResult<ServiceOffering>> + Send;
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<ServiceOffering>> + Send;
    fn list(
        &self,
        auth: &AuthInfo,
        namespace: &str,
    ) -> impl Future<Output = PlaneResult<Vec<ServiceOffering>>> + Send;
}

/// Plans support optimistic writes so visibility can be patched safely.
pub trait ServicePlanRepository: VersionedRepository<ServicePlan> + Send + Sync {
    fn create(
        &self,
        input: CreateServicePlan,
    ) -> impl Future<Output = PlaneResult<ServicePlan>> + Send;
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<ServicePlan>> + Send;
    fn list(
        &self,
        auth: &AuthInfo,
        namespace: &str,
    ) -> impl Future<Output = PlaneResult<Vec<ServicePlan>>> + Send;
    fn delete(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant namespaces: instances, bindings, processes
// ---------------------------------------------------------------------------

pub trait ServiceInstanceRepository: Send + Sync {
    fn create(
        &self,
        input: CreateServiceInstance,
    ) -> impl Future<Output = PlaneResult<ServiceInstance>> + Send;
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<ServiceInstance>> + Send;
    fn list(
        &self,
        auth: &AuthInfo,
        namespace: &str,
    ) -> impl Future<Output = PlaneResult<Vec<ServiceInstance>>> + Send;
}

pub trait ServiceBindingRepository: Send + Sync {
    fn create(
        &self,
        input: CreateServiceBinding,
    ) -> impl Future<Output = PlaneResult<ServiceBinding>> + Send;
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<ServiceBinding>> + Send;
}

pub trait ProcessRepository: VersionedRepository<Process> + Send + Sync {
    fn create(&self, input: CreateProcess) -> impl Future<Output = PlaneResult<Process>> + Send;
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<Process>> + Send;
    fn list(
        &self,
        auth: &AuthInfo,
        namespace: &str,
    ) -> impl Future<Output = PlaneResult<Vec<Process>>> + Send;
}

// ---------------------------------------------------------------------------
// Collaborators: secrets, organizations, permissions
// ---------------------------------------------------------------------------

pub trait SecretRepository: Send + Sync {
    fn create(&self, input: CreateSecret) -> impl Future<Output = PlaneResult<Secret>> + Send;
    /// Load a secret by name from the given namespace.
    fn get(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = PlaneResult<Secret>> + Send;
}

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = PlaneResult<Organization>> + Send;
    fn get(&self, id: Uuid) -> impl Future<Output = PlaneResult<Organization>> + Send;
    /// Resolve display names for the given organizations. Unknown ids are
    /// omitted from the result.
    fn list_visibility_organizations(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = PlaneResult<Vec<VisibilityOrganization>>> + Send;
}

/// Answers which namespaces a caller may read.
pub trait NamespacePermissions: Send + Sync {
    fn authorized_namespaces(
        &self,
        auth: &AuthInfo,
    ) -> impl Future<Output = PlaneResult<Vec<String>>> + Send;
}

pub trait RoleBindingRepository: Send + Sync {
    fn create(&self, input: RoleBinding) -> impl Future<Output = PlaneResult<RoleBinding>> + Send;
    fn delete(&self, input: RoleBinding) -> impl Future<Output = PlaneResult<()>> + Send;
    fn list_for_user(
        &self,
        user: &str,
    ) -> impl Future<Output = PlaneResult<Vec<RoleBinding>>> + Send;
}

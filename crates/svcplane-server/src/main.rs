//! svcplane server — application entry point.

mod config;

use svcplane_access::{ListPlansMessage, ListProcessesMessage, PlanService, ProcessService};
use svcplane_core::{AuthInfo, RequestContext};
use svcplane_db::{PlaneStore, Repositories};
use svcplane_osb::{OsbClient, ResolverStores};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("svcplane=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting svcplane...");

    let config = ServerConfig::from_env()?;

    let store = PlaneStore::open(&config.db).await?;
    let Repositories {
        brokers,
        offerings,
        plans: plan_store,
        instances,
        processes: process_store,
        secrets,
        organizations,
        role_bindings,
        ..
    } = store.repositories();

    let broker_client = OsbClient::new(
        ResolverStores {
            instances,
            plans: store.repositories().plans,
            offerings,
            brokers,
            secrets,
        },
        &config.osb,
    )?;
    let processes = ProcessService::new(process_store, role_bindings, config.access.clone());
    let plans = PlanService::new(plan_store, organizations, config.access.clone());

    let ctx = RequestContext::background();
    let known_plans = plans
        .list(&ctx, &AuthInfo::Controller, &ListPlansMessage::default())
        .await?;
    let known_processes = processes
        .list(&ctx, &AuthInfo::Controller, &ListProcessesMessage::default())
        .await?;
    tracing::info!(
        control_plane_namespace = broker_client.resolver().control_plane_namespace(),
        plans = known_plans.len(),
        processes = known_processes.len(),
        "Service plane ready"
    );

    tokio::signal::ctrl_c().await?;
    ctx.cancel();

    tracing::info!("svcplane stopped.");
    Ok(())
}

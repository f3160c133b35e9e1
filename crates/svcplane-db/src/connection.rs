//! Opening the service plane store.
//!
//! [`PlaneStore::open`] connects over WebSocket, selects the storage
//! database and applies pending migrations. [`PlaneStore::attach`] does the
//! migration step for an already-selected handle (the in-memory engine in
//! tests). Either way the store hands out the full [`Repositories`] set the
//! services are wired from.

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealOrganizationRepository, SurrealProcessRepository, SurrealRoleBindingRepository,
    SurrealSecretRepository, SurrealServiceBindingRepository, SurrealServiceBrokerRepository,
    SurrealServiceInstanceRepository, SurrealServiceOfferingRepository,
    SurrealServicePlanRepository,
};
use crate::schema::run_migrations;

/// Where the plane's records live.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint (`host:port`).
    pub url: String,
    /// SurrealDB namespace. Plane namespaces are a column on every record,
    /// not SurrealDB namespaces.
    pub namespace: String,
    pub database: String,
    /// Root user. Empty skips sign-in for servers started without auth.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "svcplane".into(),
            database: "store".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Repositories over one store handle, one per resource kind.
pub struct Repositories<C: Connection> {
    pub brokers: SurrealServiceBrokerRepository<C>,
    pub offerings: SurrealServiceOfferingRepository<C>,
    pub plans: SurrealServicePlanRepository<C>,
    pub instances: SurrealServiceInstanceRepository<C>,
    pub bindings: SurrealServiceBindingRepository<C>,
    pub processes: SurrealProcessRepository<C>,
    pub secrets: SurrealSecretRepository<C>,
    pub organizations: SurrealOrganizationRepository<C>,
    pub role_bindings: SurrealRoleBindingRepository<C>,
}

impl<C: Connection> Repositories<C> {
    pub fn new(db: &Surreal<C>) -> Self {
        Self {
            brokers: SurrealServiceBrokerRepository::new(db.clone()),
            offerings: SurrealServiceOfferingRepository::new(db.clone()),
            plans: SurrealServicePlanRepository::new(db.clone()),
            instances: SurrealServiceInstanceRepository::new(db.clone()),
            bindings: SurrealServiceBindingRepository::new(db.clone()),
            processes: SurrealProcessRepository::new(db.clone()),
            secrets: SurrealSecretRepository::new(db.clone()),
            organizations: SurrealOrganizationRepository::new(db.clone()),
            role_bindings: SurrealRoleBindingRepository::new(db.clone()),
        }
    }
}

/// A migrated store handle.
#[derive(Clone)]
pub struct PlaneStore<C: Connection> {
    db: Surreal<C>,
}

impl PlaneStore<Client> {
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening service plane store"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        if !config.username.is_empty() {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Self::attach(db).await
    }
}

impl<C: Connection> PlaneStore<C> {
    /// Bring the schema of an already-selected database up to date.
    pub async fn attach(db: Surreal<C>) -> Result<Self, DbError> {
        run_migrations(&db).await?;
        info!("Service plane store ready");
        Ok(Self { db })
    }

    pub fn repositories(&self) -> Repositories<C> {
        Repositories::new(&self.db)
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }
}

//! Integration tests for the broker client against a recording HTTP
//! server and an in-memory SurrealDB store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use svcplane_core::RequestContext;
use svcplane_core::error::PlaneError;
use svcplane_core::models::binding::{CreateServiceBinding, ServiceBinding};
use svcplane_core::models::broker::{CreateServiceBroker, ServiceBroker};
use svcplane_core::models::instance::{CreateServiceInstance, ServiceInstance};
use svcplane_core::models::offering::CreateServiceOffering;
use svcplane_core::models::plan::{
    BrokerRef, CreateServicePlan, MaintenanceInfo, OfferingRef, PlanBrokerCatalog,
    PlanVisibility, ServicePlan, ServicePlanSchemas,
};
use svcplane_core::models::secret::CreateSecret;
use svcplane_core::repository::{
    SecretRepository, ServiceBindingRepository, ServiceBrokerRepository,
    ServiceInstanceRepository, ServiceOfferingRepository, ServicePlanRepository,
};
use svcplane_db::repository::{
    SurrealSecretRepository, SurrealServiceBindingRepository, SurrealServiceBrokerRepository,
    SurrealServiceInstanceRepository, SurrealServiceOfferingRepository,
    SurrealServicePlanRepository,
};
use svcplane_osb::{LastOperation, OsbClient, OsbConfig, ResolverStores, ServiceBrokerClient};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const CF: &str = "cf";
const TENANT: &str = "space-a";

// -----------------------------------------------------------------------
// Recording broker
// -----------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: String,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct BrokerState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    reply: Arc<Mutex<(u16, String)>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl BrokerState {
    fn reply_with(&self, status: u16, body: &str) {
        *self.reply.lock().unwrap() = (status, body.to_string());
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> Recorded {
        self.requests().pop().expect("broker received no request")
    }
}

async fn record(State(state): State<BrokerState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    state.requests.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });

    let delay = *state.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let (status, body) = state.reply.lock().unwrap().clone();
    (StatusCode::from_u16(status).unwrap(), body).into_response()
}

async fn start_broker() -> (String, BrokerState) {
    let state = BrokerState {
        requests: Arc::default(),
        reply: Arc::new(Mutex::new((200, "{}".into()))),
        delay: Arc::default(),
    };
    let app = Router::new().fallback(record).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

// -----------------------------------------------------------------------
// Store fixture
// -----------------------------------------------------------------------

type Client = OsbClient<
    SurrealServiceInstanceRepository<Db>,
    SurrealServicePlanRepository<Db>,
    SurrealServiceOfferingRepository<Db>,
    SurrealServiceBrokerRepository<Db>,
    SurrealSecretRepository<Db>,
>;

struct Fixture {
    db: Surreal<Db>,
    client: Client,
    broker: ServiceBroker,
    plan: ServicePlan,
    instance: ServiceInstance,
    binding: ServiceBinding,
    state: BrokerState,
}

struct Options {
    secret: BTreeMap<String, String>,
    link_broker: bool,
    parameters: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            secret: BTreeMap::from([
                ("username".to_string(), "broker-user".to_string()),
                ("password".to_string(), "broker-pass".to_string()),
            ]),
            link_broker: true,
            parameters: Some(r#"{"size":"large","replicas":2}"#.into()),
        }
    }
}

async fn fixture_with(options: Options) -> Fixture {
    let (url, state) = start_broker().await;

    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    svcplane_db::run_migrations(&db).await.unwrap();

    let brokers = SurrealServiceBrokerRepository::new(db.clone());
    let offerings = SurrealServiceOfferingRepository::new(db.clone());
    let plans = SurrealServicePlanRepository::new(db.clone());
    let instances = SurrealServiceInstanceRepository::new(db.clone());
    let bindings = SurrealServiceBindingRepository::new(db.clone());
    let secrets = SurrealSecretRepository::new(db.clone());

    secrets
        .create(CreateSecret {
            namespace: CF.into(),
            name: "broker-creds".into(),
            data: options.secret,
        })
        .await
        .unwrap();

    let broker = brokers
        .create(CreateServiceBroker {
            namespace: CF.into(),
            name: "recording-broker".into(),
            url,
            credentials_secret: "broker-creds".into(),
        })
        .await
        .unwrap();

    let offering = offerings
        .create(CreateServiceOffering {
            namespace: CF.into(),
            name: "mysql".into(),
            description: "MySQL".into(),
            broker_catalog_id: "catalog-service-id".into(),
            broker_id: broker.id,
        })
        .await
        .unwrap();

    let plan = plans
        .create(CreateServicePlan {
            namespace: CF.into(),
            name: "small".into(),
            description: "Small".into(),
            free: true,
            broker_catalog: PlanBrokerCatalog {
                id: "catalog-plan-id".into(),
                metadata: serde_json::json!({}),
                features: Default::default(),
            },
            schemas: ServicePlanSchemas::default(),
            maintenance_info: MaintenanceInfo::default(),
            visibility: PlanVisibility::default(),
            offering: Some(OfferingRef {
                id: offering.id,
                name: offering.name.clone(),
            }),
            broker: options.link_broker.then(|| BrokerRef {
                id: broker.id,
                name: broker.name.clone(),
            }),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        })
        .await
        .unwrap();

    let instance = instances
        .create(CreateServiceInstance {
            namespace: TENANT.into(),
            name: "my-db".into(),
            plan_id: plan.id,
            parameters: options.parameters,
        })
        .await
        .unwrap();

    let binding = bindings
        .create(CreateServiceBinding {
            namespace: TENANT.into(),
            name: Some("my-binding".into()),
            instance_id: instance.id,
            app_id: Some(Uuid::new_v4()),
        })
        .await
        .unwrap();

    let client = OsbClient::new(
        ResolverStores {
            instances,
            plans,
            offerings,
            brokers,
            secrets,
        },
        &OsbConfig::default(),
    )
    .unwrap();

    Fixture {
        db,
        client,
        broker,
        plan,
        instance,
        binding,
        state,
    }
}

async fn fixture() -> Fixture {
    fixture_with(Options::default()).await
}

fn ctx() -> RequestContext {
    RequestContext::background()
}

// -----------------------------------------------------------------------
// Instances
// -----------------------------------------------------------------------

#[tokio::test]
async fn provision_sends_async_put_with_catalog_ids_and_parameters() {
    let f = fixture().await;

    f.client.provision_instance(&ctx(), &f.instance).await.unwrap();

    let request = f.state.last();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, format!("/v2/service_instances/{}", f.instance.id));
    assert_eq!(request.query.as_deref(), Some("accepts_incomplete=true"));
    assert_eq!(request.header("x-broker-api-version"), Some("2.17"));
    // base64("broker-user:broker-pass")
    assert_eq!(
        request.header("authorization"),
        Some("Basic YnJva2VyLXVzZXI6YnJva2VyLXBhc3M=")
    );
    assert_eq!(request.header("content-type"), Some("application/json"));

    let body = request.json();
    assert_eq!(body["service_id"], "catalog-service-id");
    assert_eq!(body["plan_id"], "catalog-plan-id");
    assert_eq!(body["parameters"]["size"], "large");
    assert_eq!(body["parameters"]["replicas"], 2);
}

#[tokio::test]
async fn provision_without_parameters_omits_them() {
    let f = fixture_with(Options {
        parameters: None,
        ..Options::default()
    })
    .await;

    f.client.provision_instance(&ctx(), &f.instance).await.unwrap();

    let body = f.state.last().json();
    assert!(body.get("parameters").is_none());
    assert_eq!(body["plan_id"], "catalog-plan-id");
}

#[tokio::test]
async fn malformed_parameters_fail_before_any_request() {
    let f = fixture_with(Options {
        parameters: Some("{not json".into()),
        ..Options::default()
    })
    .await;

    let err = f
        .client
        .provision_instance(&ctx(), &f.instance)
        .await
        .unwrap_err();
    match err {
        PlaneError::ParameterParse { instance_id, .. } => {
            assert_eq!(instance_id, f.instance.id.to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(f.state.requests().is_empty());
}

#[tokio::test]
async fn deprovision_sends_async_delete_without_body() {
    let f = fixture().await;

    f.client.deprovision_instance(&ctx(), &f.instance).await.unwrap();

    let request = f.state.last();
    assert_eq!(request.method, "DELETE");
    assert_eq!(request.path, format!("/v2/service_instances/{}", f.instance.id));
    assert_eq!(request.query.as_deref(), Some("accepts_incomplete=true"));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn instance_last_operation_not_found_means_gone() {
    let f = fixture().await;
    f.state.reply_with(404, "{}");

    let op = f
        .client
        .get_instance_last_operation(&ctx(), &f.instance)
        .await
        .unwrap();
    assert_eq!(op, LastOperation::gone());
    assert!(!op.exists);

    let request = f.state.last();
    assert_eq!(request.method, "GET");
    assert_eq!(
        request.path,
        format!("/v2/service_instances/{}/last_operation", f.instance.id)
    );
    assert_eq!(request.query, None);
}

#[tokio::test]
async fn instance_last_operation_reports_state() {
    let f = fixture().await;
    f.state.reply_with(200, r#"{"state":"succeeded","description":"done"}"#);

    let op = f
        .client
        .get_instance_last_operation(&ctx(), &f.instance)
        .await
        .unwrap();
    assert!(op.exists);
    assert_eq!(op.state, "succeeded");
    assert_eq!(op.description, "done");
}

#[tokio::test]
async fn unparseable_last_operation_is_reported() {
    let f = fixture().await;
    f.state.reply_with(200, "<html>oops</html>");

    let err = f
        .client
        .get_instance_last_operation(&ctx(), &f.instance)
        .await
        .unwrap_err();
    assert!(matches!(err, PlaneError::LastOperationParse { .. }));
}

#[tokio::test]
async fn broker_failure_keeps_status_and_body() {
    let f = fixture().await;
    f.state.reply_with(500, r#"{"error":"Boom","description":"broker exploded"}"#);

    let err = f
        .client
        .provision_instance(&ctx(), &f.instance)
        .await
        .unwrap_err();
    match err {
        PlaneError::BrokerRequestFailed { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, r#"{"error":"Boom","description":"broker exploded"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn not_found_is_an_error_for_mutations() {
    let f = fixture().await;
    f.state.reply_with(404, "gone");

    let err = f
        .client
        .deprovision_instance(&ctx(), &f.instance)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlaneError::BrokerRequestFailed { status: 404, .. }
    ));
}

// -----------------------------------------------------------------------
// Bindings
// -----------------------------------------------------------------------

#[tokio::test]
async fn bind_sends_async_put_on_binding_path() {
    let f = fixture().await;

    f.client.bind_service(&ctx(), &f.binding).await.unwrap();

    let request = f.state.last();
    assert_eq!(request.method, "PUT");
    assert_eq!(
        request.path,
        format!(
            "/v2/service_instances/{}/service_bindings/{}",
            f.instance.id, f.binding.id
        )
    );
    assert_eq!(request.query.as_deref(), Some("accepts_incomplete=true"));
    let body = request.json();
    assert_eq!(body["service_id"], "catalog-service-id");
    assert_eq!(body["plan_id"], "catalog-plan-id");
}

#[tokio::test]
async fn get_binding_is_synchronous_and_parses_credentials() {
    let f = fixture().await;
    f.state
        .reply_with(200, r#"{"credentials":{"uri":"mysql://db","port":3306}}"#);

    let binding = f
        .client
        .get_service_binding(&ctx(), &f.binding)
        .await
        .unwrap();
    assert_eq!(binding.credentials["uri"], "mysql://db");
    assert_eq!(binding.credentials["port"], 3306);

    let request = f.state.last();
    assert_eq!(request.method, "GET");
    assert_eq!(request.query, None);
    assert_eq!(request.json()["plan_id"], "catalog-plan-id");
}

#[tokio::test]
async fn unparseable_binding_is_reported() {
    let f = fixture().await;
    f.state.reply_with(200, r#"{"credentials":"not-a-map"}"#);

    let err = f
        .client
        .get_service_binding(&ctx(), &f.binding)
        .await
        .unwrap_err();
    match err {
        PlaneError::BindingParse { binding_id, .. } => {
            assert_eq!(binding_id, f.binding.id.to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn binding_last_operation_uses_binding_path() {
    let f = fixture().await;
    f.state.reply_with(200, r#"{"state":"in progress"}"#);

    let op = f
        .client
        .get_binding_last_operation(&ctx(), &f.binding)
        .await
        .unwrap();
    assert!(op.exists);
    assert_eq!(op.state, "in progress");

    let request = f.state.last();
    assert_eq!(
        request.path,
        format!(
            "/v2/service_instances/{}/service_bindings/{}/last_operation",
            f.instance.id, f.binding.id
        )
    );
    assert_eq!(request.query, None);

    f.state.reply_with(404, "");
    let op = f
        .client
        .get_binding_last_operation(&ctx(), &f.binding)
        .await
        .unwrap();
    assert!(!op.exists);
}

#[tokio::test]
async fn unbind_sends_async_delete() {
    let f = fixture().await;

    f.client.unbind_service(&ctx(), &f.binding).await.unwrap();

    let request = f.state.last();
    assert_eq!(request.method, "DELETE");
    assert!(request.path.ends_with(&format!("/service_bindings/{}", f.binding.id)));
    assert_eq!(request.query.as_deref(), Some("accepts_incomplete=true"));
}

// -----------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------

#[tokio::test]
async fn get_catalog_parses_services_and_plans() {
    let f = fixture().await;
    f.state.reply_with(
        200,
        r#"{"services":[{"id":"svc-1","name":"mysql","description":"MySQL","bindable":true,
            "tags":["sql"],"plans":[{"id":"plan-1","name":"small","free":true,
            "schemas":{"service_instance":{"create":{"parameters":{"type":"object"}}}}}]}]}"#,
    );

    let catalog = f.client.get_catalog(&ctx(), &f.broker).await.unwrap();
    assert_eq!(catalog.services.len(), 1);
    let service = &catalog.services[0];
    assert_eq!(service.id, "svc-1");
    assert!(service.bindable);
    assert_eq!(service.tags, vec!["sql"]);
    assert_eq!(service.plans[0].name, "small");
    assert_eq!(
        service.plans[0].schemas.service_instance.create.parameters["type"],
        "object"
    );

    let request = f.state.last();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/v2/catalog");
    assert_eq!(request.query, None);
}

#[tokio::test]
async fn malformed_catalog_is_reported() {
    let f = fixture().await;
    f.state.reply_with(200, r#"{"services":"nope"}"#);

    let err = f.client.get_catalog(&ctx(), &f.broker).await.unwrap_err();
    match err {
        PlaneError::CatalogParse { broker_id, .. } => {
            assert_eq!(broker_id, f.broker.id.to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Resolution failures
// -----------------------------------------------------------------------

#[tokio::test]
async fn missing_credential_key_is_a_credential_error() {
    let f = fixture_with(Options {
        secret: BTreeMap::from([("username".to_string(), "only-user".to_string())]),
        ..Options::default()
    })
    .await;

    let err = f.client.get_catalog(&ctx(), &f.broker).await.unwrap_err();
    match err {
        PlaneError::Credential { broker_id, reason } => {
            assert_eq!(broker_id, f.broker.id.to_string());
            assert!(reason.contains("password"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(f.state.requests().is_empty());
}

#[tokio::test]
async fn missing_secret_is_a_credential_error() {
    let f = fixture().await;
    let mut broker = f.broker.clone();
    broker.credentials_secret = "does-not-exist".into();

    let err = f.client.get_catalog(&ctx(), &broker).await.unwrap_err();
    assert!(matches!(err, PlaneError::Credential { .. }));
}

#[tokio::test]
async fn plan_without_broker_reference_is_a_linkage_error() {
    let f = fixture_with(Options {
        link_broker: false,
        ..Options::default()
    })
    .await;

    let err = f
        .client
        .deprovision_instance(&ctx(), &f.instance)
        .await
        .unwrap_err();
    match err {
        PlaneError::Linkage { entity, id, .. } => {
            assert_eq!(entity, "service_plan");
            assert_eq!(id, f.plan.id.to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_plan_is_not_found() {
    let f = fixture().await;
    let plans = SurrealServicePlanRepository::new(f.db.clone());
    plans
        .delete(&svcplane_core::AuthInfo::Controller, CF, f.plan.id)
        .await
        .unwrap();

    let err = f
        .client
        .provision_instance(&ctx(), &f.instance)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn binding_with_missing_instance_is_not_found() {
    let f = fixture().await;
    let orphan = ServiceBinding {
        instance_id: Uuid::new_v4(),
        ..f.binding.clone()
    };

    let err = f.client.bind_service(&ctx(), &orphan).await.unwrap_err();
    assert!(err.is_not_found());
}

// -----------------------------------------------------------------------
// Cancellation
// -----------------------------------------------------------------------

#[tokio::test]
async fn deadline_aborts_slow_broker_call() {
    let f = fixture().await;
    *f.state.delay.lock().unwrap() = Some(Duration::from_secs(5));

    let ctx = RequestContext::background().with_timeout(Duration::from_millis(100));
    let err = f
        .client
        .provision_instance(&ctx, &f.instance)
        .await
        .unwrap_err();
    assert!(matches!(err, PlaneError::Cancelled { .. }));
}

#[tokio::test]
async fn cancelled_context_sends_nothing() {
    let f = fixture().await;
    let token = CancellationToken::new();
    token.cancel();

    let ctx = RequestContext::with_token(token);
    let err = f.client.get_catalog(&ctx, &f.broker).await.unwrap_err();
    assert!(matches!(err, PlaneError::Cancelled { .. }));
    assert!(f.state.requests().is_empty());
}

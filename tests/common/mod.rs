#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use fleet_dispatch_api::auth::{generate_jwt, Claims};
use fleet_dispatch_api::config::ListingConfig;
use fleet_dispatch_api::gateway::{Gateway, Principal, ResourceType, Role};
use fleet_dispatch_api::middleware::JwtIdentityResolver;
use fleet_dispatch_api::routes::app;
use fleet_dispatch_api::services::VroomClient;
use fleet_dispatch_api::state::AppState;
use fleet_dispatch_api::storage::MemoryStore;

pub const SECRET: &str = "integration-test-secret";
pub const DRIVER_A: &str = "driver-a";
pub const DRIVER_B: &str = "driver-b";

pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Gateway on a free port, backed by a freshly seeded in-memory store
pub async fn start_server() -> Result<TestServer> {
    // Nothing listens on an unused port, so optimization calls fail with 502
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    start_server_with_vroom(format!("http://127.0.0.1:{}", port)).await
}

pub async fn start_server_with_vroom(vroom_url: String) -> Result<TestServer> {
    let store = Arc::new(MemoryStore::new());
    seed(&store).await;

    let optimizer = Arc::new(VroomClient::new(vroom_url, Duration::from_secs(5))?);
    let gateway = Gateway::new(store.clone(), optimizer, ListingConfig::default());
    let state = AppState::new(gateway, Arc::new(JwtIdentityResolver::new(SECRET)));

    let (base_url, handle) = serve(app(state)).await?;
    let server = TestServer {
        base_url,
        store,
        client: reqwest::Client::new(),
        handle,
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// Stand-in VROOM endpoint answering every problem with `status` and `body`
pub async fn start_fake_vroom(status: StatusCode, body: Value) -> Result<(String, JoinHandle<()>)> {
    let router = Router::new().route(
        "/",
        post(move |Json(_problem): Json<Value>| {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    );
    serve(router).await
}

async fn serve(router: Router) -> Result<(String, JoinHandle<()>)> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((format!("http://127.0.0.1:{}", port), handle))
}

pub fn token_for(id: &str, role: Role) -> String {
    let principal = Principal::new(id, role);
    generate_jwt(&Claims::with_expiry(&principal, 1), SECRET).expect("token")
}

pub fn admin_token() -> String {
    token_for("user-admin", Role::Admin)
}

pub fn dispatcher_token() -> String {
    token_for("user-dispatch", Role::Dispatcher)
}

pub fn driver_token(id: &str) -> String {
    token_for(id, Role::Driver)
}

async fn seed(store: &MemoryStore) {
    store
        .seed(
            ResourceType::User,
            vec![
                json!({ "id": "user-admin", "name": "Ada Admin", "email": "ada@fleet.test", "role": "ADMIN",
                        "password_hash": "$argon2id$admin", "created_at": "2024-01-01T00:00:00.000Z" }),
                json!({ "id": "user-dispatch", "name": "Dee Dispatch", "email": "dee@fleet.test", "role": "DISPATCHER",
                        "password_hash": "$argon2id$dispatch", "created_at": "2024-01-02T00:00:00.000Z" }),
                json!({ "id": DRIVER_A, "name": "Ann Driver", "email": "ann@fleet.test", "role": "DRIVER",
                        "password_hash": "$argon2id$ann", "created_at": "2024-01-03T00:00:00.000Z" }),
                json!({ "id": DRIVER_B, "name": "Bo Driver", "email": "bo@fleet.test", "role": "DRIVER",
                        "password_hash": "$argon2id$bo", "created_at": "2024-01-04T00:00:00.000Z" }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::Driver,
            vec![
                json!({ "id": DRIVER_A, "first_name": "Ann", "last_name": "Driver", "employment_status": "ACTIVE",
                        "created_at": "2024-01-03T00:00:00.000Z" }),
                json!({ "id": DRIVER_B, "first_name": "Bo", "last_name": "Driver", "employment_status": "ACTIVE",
                        "created_at": "2024-01-04T00:00:00.000Z" }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::Truck,
            vec![json!({ "id": "truck-1", "make": "Peterbilt", "model": "579", "year": 2021,
                         "truck_status": "AVAILABLE", "created_at": "2024-02-01T00:00:00.000Z" })],
        )
        .await;

    let loads = (1..=6).map(|n| {
        let driver = if n % 2 == 0 { DRIVER_B } else { DRIVER_A };
        json!({
            "id": format!("load-{}", n),
            "origin": "Dallas, TX",
            "destination": "Austin, TX",
            "weight": 1000.0 * n as f64,
            "status": "ASSIGNED",
            "assigned_driver": driver,
            "started_at": format!("2024-03-0{}T08:00:00.000Z", n),
            "created_at": "2024-02-01T00:00:00.000Z"
        })
    });
    store.seed(ResourceType::Load, loads).await;
}

pub fn vroom_problem() -> Value {
    json!({
        "vehicles": [{ "id": 1, "start": [-96.80, 32.78] }],
        "jobs": [{ "id": 10, "location": [-97.33, 32.75] }]
    })
}

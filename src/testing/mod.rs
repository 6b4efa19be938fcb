//! Fixtures for gateway unit tests: principals, a seeded in-memory store and
//! a scripted route optimizer.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ListingConfig;
use crate::gateway::{Gateway, Principal, ResourceType, Role};
use crate::services::vroom::{RouteOptimizer, UpstreamError};
use crate::storage::MemoryStore;

pub const DRIVER_A: &str = "driver-a";
pub const DRIVER_B: &str = "driver-b";

pub fn admin() -> Principal {
    Principal::new("user-admin", Role::Admin)
}

pub fn dispatcher() -> Principal {
    Principal::new("user-dispatch", Role::Dispatcher)
}

pub fn driver(id: &str) -> Principal {
    Principal::new(id, Role::Driver)
}

/// Optimizer that answers every call the same way and counts calls
pub struct ScriptedOptimizer {
    outcome: Outcome,
    calls: AtomicUsize,
}

enum Outcome {
    Solve(Value),
    Status(u16),
}

impl ScriptedOptimizer {
    pub fn solving(solution: Value) -> Self {
        Self { outcome: Outcome::Solve(solution), calls: AtomicUsize::new(0) }
    }

    pub fn failing(status: u16) -> Self {
        Self { outcome: Outcome::Status(status), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteOptimizer for ScriptedOptimizer {
    async fn optimize(&self, _problem: &Value) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Solve(solution) => Ok(solution.clone()),
            Outcome::Status(status) => Err(UpstreamError::Status {
                status: *status,
                body: "solver unavailable".to_string(),
            }),
        }
    }
}

pub fn vroom_problem() -> Value {
    json!({
        "vehicles": [{ "id": 1, "start": [-96.80, 32.78] }],
        "jobs": [{ "id": 10, "location": [-97.33, 32.75] }]
    })
}

pub fn vroom_solution() -> Value {
    json!({ "code": 0, "summary": { "cost": 1234, "routes": 1 }, "routes": [] })
}

pub struct Harness {
    pub gateway: Gateway,
    pub store: Arc<MemoryStore>,
    pub optimizer: Arc<ScriptedOptimizer>,
}

pub async fn harness() -> Harness {
    harness_with(ScriptedOptimizer::solving(vroom_solution())).await
}

pub async fn harness_with(optimizer: ScriptedOptimizer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    seed(&store).await;
    let optimizer = Arc::new(optimizer);
    let gateway = Gateway::new(store.clone(), optimizer.clone(), ListingConfig::default());
    Harness { gateway, store, optimizer }
}

async fn seed(store: &MemoryStore) {
    store
        .seed(
            ResourceType::User,
            vec![
                json!({
                    "id": "user-admin", "name": "Ada Admin", "email": "ada@fleet.test", "role": "ADMIN",
                    "password_hash": "$argon2id$admin", "assigned_fleet": "north",
                    "created_at": "2024-01-01T00:00:00.000Z", "updated_at": "2024-01-01T00:00:00.000Z"
                }),
                json!({
                    "id": "user-dispatch", "name": "Dee Dispatch", "email": "dee@fleet.test", "role": "DISPATCHER",
                    "password_hash": "$argon2id$dispatch", "assigned_fleet": "north",
                    "created_at": "2024-01-02T00:00:00.000Z", "updated_at": "2024-01-02T00:00:00.000Z"
                }),
                json!({
                    "id": DRIVER_A, "name": "Ann Driver", "email": "ann@fleet.test", "role": "DRIVER",
                    "password_hash": "$argon2id$ann", "assigned_fleet": "south",
                    "created_at": "2024-01-03T00:00:00.000Z", "updated_at": "2024-01-03T00:00:00.000Z"
                }),
                json!({
                    "id": DRIVER_B, "name": "Bo Driver", "email": "bo@fleet.test", "role": "DRIVER",
                    "password_hash": "$argon2id$bo", "assigned_fleet": "south",
                    "created_at": "2024-01-04T00:00:00.000Z", "updated_at": "2024-01-04T00:00:00.000Z"
                }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::Driver,
            vec![
                json!({
                    "id": DRIVER_A, "first_name": "Ann", "last_name": "Driver", "driver_status": "AVAILABLE",
                    "employment_status": "ACTIVE", "on_duty": true, "license_number": "TX-1001",
                    "created_at": "2024-01-03T00:00:00.000Z", "updated_at": "2024-01-03T00:00:00.000Z"
                }),
                json!({
                    "id": DRIVER_B, "first_name": "Bo", "last_name": "Driver", "driver_status": "ASSIGNED",
                    "employment_status": "ON_LEAVE", "on_duty": false, "license_number": "TX-1002",
                    "created_at": "2024-01-04T00:00:00.000Z", "updated_at": "2024-01-04T00:00:00.000Z"
                }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::Truck,
            vec![
                json!({
                    "id": "truck-1", "truck_number": 101, "make": "Peterbilt", "model": "579", "year": 2021,
                    "truck_status": "AVAILABLE", "created_at": "2024-02-01T00:00:00.000Z"
                }),
                json!({
                    "id": "truck-2", "truck_number": 102, "make": "Kenworth", "model": "T680", "year": 2019,
                    "truck_status": "MAINTENANCE", "created_at": "2024-02-02T00:00:00.000Z"
                }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::Trailer,
            vec![json!({
                "id": "trailer-1", "trailer_number": 501, "model": "Reefer 53", "year": 2020,
                "trailer_status": "AVAILABLE", "created_at": "2024-02-03T00:00:00.000Z"
            })],
        )
        .await;

    store
        .seed(
            ResourceType::Load,
            vec![
                json!({
                    "id": "load-1", "origin": "Dallas, TX", "destination": "Austin, TX", "weight": 18000.0,
                    "status": "IN_PROGRESS", "assigned_driver": DRIVER_A, "is_active": true,
                    "started_at": "2024-03-01T08:00:00.000Z", "created_at": "2024-02-20T00:00:00.000Z"
                }),
                json!({
                    "id": "load-2", "origin": "Houston, TX", "destination": "El Paso, TX", "weight": 22000.0,
                    "status": "IN_PROGRESS", "assigned_driver": DRIVER_B, "is_active": true,
                    "started_at": "2024-03-02T08:00:00.000Z", "created_at": "2024-02-21T00:00:00.000Z"
                }),
                json!({
                    "id": "load-3", "origin": "Tulsa, OK", "destination": "Dallas, TX", "weight": 9000.0,
                    "status": "DELIVERED", "assigned_driver": DRIVER_A, "is_active": false,
                    "started_at": "2024-03-03T08:00:00.000Z", "created_at": "2024-02-22T00:00:00.000Z"
                }),
                json!({
                    "id": "load-4", "origin": "Waco, TX", "destination": "Lubbock, TX", "weight": 15000.0,
                    "status": "SUGGESTED", "assigned_driver": DRIVER_B, "assigned_truck": "truck-1",
                    "assigned_trailer": "trailer-1", "is_active": true, "created_at": "2024-02-23T00:00:00.000Z"
                }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::Route,
            vec![
                json!({
                    "id": "route-a", "name": "A", "status": "SUGGESTED", "total_distance": 412.5,
                    "assigned_driver": DRIVER_B, "assigned_truck": "truck-1", "assigned_trailer": "trailer-1",
                    "created_at": "2024-02-24T00:00:00.000Z"
                }),
                json!({
                    "id": "route-b", "name": "B", "status": "SUGGESTED", "total_distance": 96.0,
                    "created_at": "2024-02-25T00:00:00.000Z"
                }),
            ],
        )
        .await;

    store
        .seed(
            ResourceType::TimeOff,
            vec![
                json!({
                    "id": "timeoff-1", "driver_id": DRIVER_A, "reason": "Family visit", "status": "PENDING",
                    "start_date": "2024-04-01", "end_date": "2024-04-03", "created_at": "2024-03-10T00:00:00.000Z"
                }),
                json!({
                    "id": "timeoff-2", "driver_id": DRIVER_B, "reason": "Medical", "status": "APPROVED",
                    "start_date": "2024-05-01", "end_date": "2024-05-02", "created_at": "2024-03-11T00:00:00.000Z"
                }),
            ],
        )
        .await;
}

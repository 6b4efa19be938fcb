use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - Service descriptor
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Fleet Dispatch API",
            "version": version,
            "description": "Access gateway for fleet dispatch resources",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "resources": "/api/:resource[/:id] for users, drivers, trucks, trailers, loads, time-off, routes (bearer token)",
                "suggestions": "/api/suggestions/:resource for loads or routes (bearer token, admin or dispatcher)",
                "me": "/api/me (bearer token)",
                "roles": "/api/users/:id/role (bearer token, admin)",
                "vroom": "/api/vroom (bearer token, admin or dispatcher)",
            }
        }
    }))
}

/// GET /health - Storage connectivity
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let storage = state.gateway.storage();

    storage.health_check().await.map_err(|e| {
        tracing::error!(error = %e, backend = storage.backend_name(), "storage health check failed");
        ApiError::service_unavailable(format!("{} storage unavailable", storage.backend_name()))
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "storage": storage.backend_name()
    })))
}

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};

use super::{payload_from, resolve_resource};
use crate::error::ApiError;
use crate::gateway::{Envelope, Payload, ResourceType, ShapedResponse};
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

/// PATCH /api/users/:id/role - Assign a role; only the `role` field is forwarded
pub async fn assign_role(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ShapedResponse> {
    // Mounted under /api/:resource so it shares the router node with records
    if resolve_resource(&segment)? != ResourceType::User {
        return Err(ApiError::not_found(format!("No role endpoint for '{}'", segment)));
    }
    let payload = match payload_from(body) {
        Payload::Json(body) => Payload::Json(json!({ "role": body.get("role").cloned().unwrap_or(Value::Null) })),
        other => other,
    };
    let shaped = state
        .gateway
        .handle(session.principal(), Envelope::update(ResourceType::User, id, payload))
        .await?;
    Ok(ApiResponse::success(shaped))
}

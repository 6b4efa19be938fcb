use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use super::payload_from;
use crate::gateway::{Envelope, GatewayError, ResourceType, ShapedResponse};
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

/// GET /api/me - The caller's own user record
pub async fn get(State(state): State<AppState>, session: Session) -> ApiResult<ShapedResponse> {
    let principal = session.principal().ok_or(GatewayError::Unauthenticated)?;
    let shaped = state
        .gateway
        .handle(Some(principal), Envelope::read(ResourceType::User, principal.id.clone()))
        .await?;
    Ok(ApiResponse::success(shaped))
}

/// PATCH /api/me - Update the caller's own user record
pub async fn patch(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ShapedResponse> {
    let principal = session.principal().ok_or(GatewayError::Unauthenticated)?;
    let envelope = Envelope::update(ResourceType::User, principal.id.clone(), payload_from(body));
    let shaped = state.gateway.handle(Some(principal), envelope).await?;
    Ok(ApiResponse::success(shaped))
}

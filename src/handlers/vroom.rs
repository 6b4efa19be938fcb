use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use super::payload_from;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

/// POST /api/vroom - Route-optimization pass-through
pub async fn optimize(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let solution = state
        .gateway
        .optimize_routes(session.principal(), payload_from(body))
        .await?;
    Ok(ApiResponse::success(solution))
}

use axum::extract::{Path, State};
use serde_json::Value;

use super::resolve_resource;
use crate::error::ApiError;
use crate::gateway::Suggestions;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

/// DELETE /api/suggestions/:resource - Discard outstanding load or route suggestions
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    Path(segment): Path<String>,
) -> ApiResult<Value> {
    let target = Suggestions::for_resource(resolve_resource(&segment)?)
        .ok_or_else(|| ApiError::not_found(format!("No suggestions for '{}'", segment)))?;
    let outcome = state.gateway.clear_suggestions(session.principal(), target).await?;
    Ok(ApiResponse::success(outcome))
}

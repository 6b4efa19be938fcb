use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

use super::{payload_from, resolve_resource};
use crate::gateway::{Envelope, ShapedResponse};
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

/// GET /api/:resource - List records (`limit`, `random`, equality filters)
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    Path(segment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ShapedResponse> {
    let resource = resolve_resource(&segment)?;
    let shaped = state
        .gateway
        .handle(session.principal(), Envelope::list(resource, query))
        .await?;
    Ok(ApiResponse::success(shaped))
}

/// POST /api/:resource - Create a record
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Path(segment): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ShapedResponse> {
    let resource = resolve_resource(&segment)?;
    let shaped = state
        .gateway
        .handle(session.principal(), Envelope::create(resource, payload_from(body)))
        .await?;
    Ok(ApiResponse::success(shaped))
}

/// GET /api/:resource/:id - Read one record
pub async fn read(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
) -> ApiResult<ShapedResponse> {
    let resource = resolve_resource(&segment)?;
    let shaped = state
        .gateway
        .handle(session.principal(), Envelope::read(resource, id))
        .await?;
    Ok(ApiResponse::success(shaped))
}

/// PUT|PATCH /api/:resource/:id - Update fields of one record
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ShapedResponse> {
    let resource = resolve_resource(&segment)?;
    let shaped = state
        .gateway
        .handle(session.principal(), Envelope::update(resource, id, payload_from(body)))
        .await?;
    Ok(ApiResponse::success(shaped))
}

/// DELETE /api/:resource/:id - Delete one record, returning it
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
) -> ApiResult<ShapedResponse> {
    let resource = resolve_resource(&segment)?;
    let shaped = state
        .gateway
        .handle(session.principal(), Envelope::delete(resource, id))
        .await?;
    Ok(ApiResponse::success(shaped))
}

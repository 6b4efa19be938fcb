// handlers/mod.rs - thin adapters from HTTP to gateway envelopes
//
// Public (no credential):  system
// Gateway-enforced:        resource, me, users, suggestions, vroom
pub mod me;
pub mod resource;
pub mod suggestions;
pub mod system;
pub mod users;
pub mod vroom;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;
use crate::gateway::{Payload, ResourceType};

/// Maps the `:resource` path segment, 404 for anything unmanaged
pub(crate) fn resolve_resource(segment: &str) -> Result<ResourceType, ApiError> {
    ResourceType::from_segment(segment)
        .ok_or_else(|| ApiError::not_found(format!("Unknown resource '{}'", segment)))
}

/// Defers body errors to the gateway so authentication is still checked first
pub(crate) fn payload_from(body: Result<Json<Value>, JsonRejection>) -> Payload {
    match body {
        Ok(Json(value)) => Payload::Json(value),
        Err(JsonRejection::MissingJsonContentType(_)) => {
            Payload::Malformed("expected Content-Type: application/json".to_string())
        }
        Err(rejection) => Payload::Malformed(rejection.body_text()),
    }
}

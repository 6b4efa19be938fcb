use serde::Serialize;
use thiserror::Error;

use super::principal::Role;
use super::resource::ResourceType;
use crate::services::vroom::UpstreamError;
use crate::storage::StorageError;

/// One offending field in a rejected payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every way a gateway request can fail; maps one-to-one onto HTTP statuses
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{role} may not {action}")]
    Forbidden { role: Role, action: String },

    #[error("invalid payload: {}", summarize(.0))]
    InvalidPayload(Vec<FieldError>),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: ResourceType, id: String },

    #[error("storage failure: {0}")]
    Storage(#[source] StorageError),

    #[error("route optimization failed: {0}")]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    pub fn forbidden(role: Role, action: impl Into<String>) -> Self {
        GatewayError::Forbidden { role, action: action.into() }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::InvalidPayload(vec![FieldError::new(field, reason)])
    }

    pub fn not_found(resource: ResourceType, id: impl Into<String>) -> Self {
        GatewayError::NotFound { resource, id: id.into() }
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { resource, id } => GatewayError::NotFound { resource, id },
            StorageError::Duplicate { .. } => GatewayError::invalid("id", "already exists"),
            other => GatewayError::Storage(other),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

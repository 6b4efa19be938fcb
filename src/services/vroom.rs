//! Route-optimization collaborator (VROOM).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::RoutingConfig;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to route optimizer failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("route optimizer answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("route optimizer reported error code {code}: {message}")]
    Solver { code: i64, message: String },

    #[error("route optimizer returned an unreadable body: {0}")]
    Decode(String),
}

/// Anything that can turn a VROOM problem into a VROOM solution
#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    async fn optimize(&self, problem: &Value) -> Result<Value, UpstreamError>;
}

pub struct VroomClient {
    client: reqwest::Client,
    url: String,
}

impl VroomClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }

    pub fn from_config(config: &RoutingConfig) -> Result<Self, UpstreamError> {
        Self::new(config.vroom_url.clone(), Duration::from_millis(config.timeout_ms))
    }
}

#[async_trait]
impl RouteOptimizer for VroomClient {
    async fn optimize(&self, problem: &Value) -> Result<Value, UpstreamError> {
        debug!(url = %self.url, "forwarding route optimization request");
        let response = self.client.post(&self.url).json(problem).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }

        let solution: Value = serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        check_solver_code(&solution)?;
        Ok(solution)
    }
}

/// VROOM signals solver failures in-band with a non-zero `code`
fn check_solver_code(solution: &Value) -> Result<(), UpstreamError> {
    match solution.get("code").and_then(Value::as_i64) {
        Some(0) | None => Ok(()),
        Some(code) => Err(UpstreamError::Solver {
            code,
            message: solution
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }),
    }
}

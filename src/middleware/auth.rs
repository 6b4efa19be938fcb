use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use tracing::debug;

use crate::auth::validate_jwt;
use crate::gateway::Principal;
use crate::state::AppState;

/// Resolves the calling principal from request credentials.
///
/// Resolution never fails the request: a missing, malformed or expired
/// credential yields `None` and the gateway answers `Unauthenticated`.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Bearer JWT resolver (HS256, shared secret)
pub struct JwtIdentityResolver {
    secret: String,
}

impl JwtIdentityResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn from_config() -> Self {
        Self::new(crate::config::config().security.jwt_secret.clone())
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = match extract_jwt_from_headers(headers) {
            Ok(token) => token,
            Err(reason) => {
                debug!(reason, "no usable credential");
                return None;
            }
        };

        match validate_jwt(&token, &self.secret).and_then(Principal::try_from) {
            Ok(principal) => Some(principal),
            Err(e) => {
                debug!(error = %e, "credential rejected");
                None
            }
        }
    }
}

/// Identity of the current request, inserted by [`identity_middleware`]
#[derive(Clone, Debug, Default)]
pub struct Session(pub Option<Principal>);

impl Session {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().unwrap_or_default())
    }
}

/// Resolves the principal once per request and stores it as a [`Session`]
pub async fn identity_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let principal = state.identity.resolve(request.headers()).await;
    request.extensions_mut().insert(Session(principal));
    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("empty bearer token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt, Claims};
    use crate::gateway::Role;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn resolves_valid_bearer_token() {
        let principal = Principal::new("driver-1", Role::Driver);
        let token = generate_jwt(&Claims::with_expiry(&principal, 1), "s3cret").unwrap();
        let resolver = JwtIdentityResolver::new("s3cret");

        let resolved = resolver.resolve(&headers(&format!("Bearer {}", token))).await;
        assert_eq!(resolved, Some(principal));
    }

    #[tokio::test]
    async fn bad_credentials_resolve_to_absent() {
        let resolver = JwtIdentityResolver::new("s3cret");
        assert_eq!(resolver.resolve(&HeaderMap::new()).await, None);
        assert_eq!(resolver.resolve(&headers("Basic dXNlcjpwYXNz")).await, None);
        assert_eq!(resolver.resolve(&headers("Bearer ")).await, None);
        assert_eq!(resolver.resolve(&headers("Bearer not.a.jwt")).await, None);
    }
}

pub mod auth;
pub mod response;

pub use auth::{identity_middleware, IdentityResolver, JwtIdentityResolver, Session};
pub use response::{ApiResponse, ApiResult};

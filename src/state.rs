use std::sync::Arc;

use crate::gateway::Gateway;
use crate::middleware::IdentityResolver;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(gateway: Gateway, identity: Arc<dyn IdentityResolver>) -> Self {
        Self { gateway, identity }
    }
}

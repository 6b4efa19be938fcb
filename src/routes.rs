use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::config;
use crate::handlers;
use crate::middleware::identity_middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let api = config().api.clone();

    let router = Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        // Gateway-enforced API
        .merge(account_routes())
        .merge(vroom_routes())
        .merge(suggestion_routes())
        .merge(resource_routes())
        // Global middleware
        .layer(middleware::from_fn_with_state(state.clone(), identity_middleware))
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes))
        .layer(cors_layer())
        .with_state(state);

    if api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn account_routes() -> Router<AppState> {
    use handlers::{me, users};

    Router::new()
        .route("/api/me", get(me::get).patch(me::patch))
        .route("/api/:resource/:id/role", patch(users::assign_role))
}

fn vroom_routes() -> Router<AppState> {
    Router::new().route("/api/vroom", post(handlers::vroom::optimize))
}

fn suggestion_routes() -> Router<AppState> {
    Router::new().route("/api/suggestions/:resource", delete(handlers::suggestions::clear))
}

fn resource_routes() -> Router<AppState> {
    use handlers::resource;

    Router::new()
        // Collection
        .route("/api/:resource", get(resource::list).post(resource::create))
        // Individual record
        .route(
            "/api/:resource/:id",
            get(resource::read)
                .put(resource::update)
                .patch(resource::update)
                .delete(resource::delete),
        )
}

fn cors_layer() -> CorsLayer {
    let security = &config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

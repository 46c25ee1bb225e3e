//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::handlers::{
    create_device, create_device_type, create_folder, create_user, delete_device,
    delete_device_type, delete_entry, download_file, get_device, get_device_by_uid,
    get_device_type, get_mount, get_user, list_device_types, list_devices, list_files,
    list_users, login, logout, me, merge_device_private_data, partitions, set_mount,
    update_device, update_device_status, update_device_type, update_user, upload_files,
    validate_path, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, jwt_auth, login_rate_limit, security_headers, JwtState,
    RateLimitState,
};

/// Router settings not carried in the application state.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
    /// Maximum upload request body in bytes.
    pub max_upload_bytes: usize,
    /// Login requests per minute per client IP.
    pub login_rate_limit: u32,
    /// API requests per minute per client IP.
    pub api_rate_limit: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            max_upload_bytes: 100 * 1024 * 1024,
            login_rate_limit: 5,
            api_rate_limit: 300,
        }
    }
}

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    config: &RouterConfig,
) -> Router {
    let rate_limit_state = Arc::new(RateLimitState::new(
        config.login_rate_limit,
        config.api_rate_limit,
    ));

    let login_limit = rate_limit_state.clone();
    let auth_routes = Router::new()
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn(move |req, next| {
                let state = login_limit.clone();
                login_rate_limit(state, req, next)
            })),
        )
        .route("/logout", post(logout))
        .route("/me", get(me));

    let user_routes = Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", get(get_user).put(update_user));

    let cloud_routes = Router::new()
        .route("/files", get(list_files))
        .route("/files/*path", delete(delete_entry))
        .route("/folders", post(create_folder))
        .route(
            "/upload",
            post(upload_files).layer(
                ServiceBuilder::new()
                    .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
                    .layer(DefaultBodyLimit::disable()),
            ),
        )
        .route("/download/*path", get(download_file))
        .route("/mount", get(get_mount).put(set_mount))
        .route("/validate-path", post(validate_path))
        .route("/partitions", get(partitions));

    let device_routes = Router::new()
        .route("/", post(create_device).get(list_devices))
        .route("/types", post(create_device_type).get(list_device_types))
        .route(
            "/types/:id",
            get(get_device_type)
                .put(update_device_type)
                .delete(delete_device_type),
        )
        .route("/by-uid/:device_uid", get(get_device_by_uid))
        .route("/:id", get(get_device).put(update_device).delete(delete_device))
        .route("/:id/status", put(update_device_status))
        .route("/:id/private-data", patch(merge_device_private_data));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/cloud", cloud_routes)
        .nest("/devices", device_routes);

    let jwt_state_for_middleware = jwt_state.clone();
    let api_limit = rate_limit_state.clone();
    rate_limit_state.clone().start_cleanup_task();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                }))
                .layer(middleware::from_fn(move |req, next| {
                    let state = api_limit.clone();
                    api_rate_limit(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

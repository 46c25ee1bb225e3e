//! Rate limiting middleware.
//!
//! Login attempts are budgeted per client IP. Other API requests are
//! budgeted per signed-in user, falling back to the client IP for
//! anonymous requests, so users behind one address do not starve each other.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::{fmt, net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;
use crate::web::middleware::JwtState;

type KeyedLimiter<K> = RateLimiter<K, DefaultKeyedStateStore<K>, DefaultClock>;

/// Whom a request is charged to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    /// Signed-in user.
    User(i64),
    /// Anonymous client address.
    Ip(String),
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::User(id) => write!(f, "user:{id}"),
            ClientKey::Ip(ip) => write!(f, "ip:{ip}"),
        }
    }
}

fn per_minute(requests: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN))
}

/// Shared limiter state.
pub struct RateLimitState {
    login: KeyedLimiter<String>,
    api: KeyedLimiter<ClientKey>,
}

impl RateLimitState {
    /// Create limiters allowing the given requests per minute.
    pub fn new(login_rate_limit: u32, api_rate_limit: u32) -> Self {
        Self {
            login: RateLimiter::keyed(per_minute(login_rate_limit)),
            api: RateLimiter::keyed(per_minute(api_rate_limit)),
        }
    }

    /// Charge one login attempt to `ip`. Returns false when over budget.
    pub fn check_login(&self, ip: &str) -> bool {
        self.login.check_key(&ip.to_string()).is_ok()
    }

    /// Charge one API request to `key`. Returns false when over budget.
    pub fn check_api(&self, key: &ClientKey) -> bool {
        self.api.check_key(key).is_ok()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.login.len() + self.api.len()
    }

    /// Forget clients whose budget has fully refilled.
    pub fn cleanup(&self) {
        self.login.retain_recent();
        self.api.retain_recent();
        self.login.shrink_to_fit();
        self.api.shrink_to_fit();
    }

    /// Start a background task to periodically clean up idle clients.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                self.cleanup();
                tracing::trace!(clients = self.tracked_clients(), "Rate limiter cleaned up");
            }
        });
    }
}

/// Extract client IP from request.
fn get_client_ip(req: &Request<Body>) -> String {
    // Reverse proxy headers first
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Pick the budget a request is charged to.
///
/// Relies on `jwt_auth` having run first to provide the JWT state.
fn client_key(req: &Request<Body>) -> ClientKey {
    req.extensions()
        .get::<Arc<JwtState>>()
        .and_then(|jwt| jwt.user_id(req.headers()))
        .map(ClientKey::User)
        .unwrap_or_else(|| ClientKey::Ip(get_client_ip(req)))
}

/// Rate limiting middleware for login endpoint.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req);

    if !state.check_login(&ip) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::too_many_requests("Too many login attempts. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

/// Rate limiting middleware for general API.
pub async fn api_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req);

    if !state.check_api(&key) {
        tracing::warn!(client = %key, "API rate limit exceeded");
        return ApiError::too_many_requests("Too many requests. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

//! Authentication handlers.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::auth::CredentialHasher;
use crate::cloud::ScopedFileBrowser;
use crate::db::UserRepository;
use crate::web::dto::{ApiResponse, LoginRequest, LoginResponse, UserResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};
use crate::Database;

/// Thread-safe database handle for Web API.
pub type SharedDatabase = Arc<Database>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: SharedDatabase,
    /// Per-user file browser.
    pub browser: ScopedFileBrowser,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Name of the session cookie.
    pub session_cookie: String,
    /// Password hasher at the configured cost.
    pub hasher: CredentialHasher,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: SharedDatabase, browser: ScopedFileBrowser, jwt_secret: &str, access_expiry: u64) -> Self {
        Self {
            db,
            browser,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            session_cookie: "cloud_session".to_string(),
            hasher: CredentialHasher::default(),
        }
    }

    /// Set the password hasher.
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the session cookie name.
    pub fn with_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    fn session_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.session_cookie.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }
}

/// POST /api/auth/login - User login.
///
/// Returns the access token and also sets it as an HttpOnly session cookie.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    let user =
        crate::auth::authenticate(state.db.pool(), &state.hasher, &req.username, &req.password)
            .await?;

    let access_token = state.generate_access_token(user.id, &user.username)?;

    let jar = jar.add(state.session_cookie(access_token.clone()));
    let response = LoginResponse {
        access_token,
        expires_in: state.access_token_expiry,
        user: user.into(),
    };

    Ok((jar, Json(ApiResponse::new(response))))
}

/// POST /api/auth/logout - Clear the session cookie.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    let jar = jar.remove(state.session_cookie(String::new()));
    (jar, Json(ApiResponse::new(())))
}

/// GET /api/auth/me - Get current user info.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

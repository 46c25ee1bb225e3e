//! User handlers for Web API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::{self, validation, RegistrationRequest};
use crate::db::{UserRepository, UserUpdate};
use crate::web::dto::{
    ApiResponse, CreateUserRequest, PaginatedResponse, PaginationQuery, UpdateUserRequest,
    UserResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// POST /api/users - Create an account.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Username already exists"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let mut request = RegistrationRequest::new(req.username, req.password);
    if let Some(email) = req.email {
        request = request.with_email(email);
    }
    if let Some(full_name) = req.full_name {
        request = request.with_full_name(full_name);
    }

    let user = auth::create_user(state.db.pool(), &state.hasher, request).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(user.into()))))
}

/// GET /api/users - List users (paginated).
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let (offset, limit) = pagination.to_offset_limit();
    let repo = UserRepository::new(state.db.pool());

    let users = repo.list(offset, limit).await?;
    let total = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(Into::into).collect(),
        pagination.page.max(1),
        limit as u32,
        total as u64,
    )))
}

/// GET /api/users/:id - Get a user by ID.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// PUT /api/users/:id - Update the caller's own profile.
///
/// An empty email or full name clears it. A new password needs the
/// current one.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Current password missing"),
        (status = 401, description = "Unauthorized or wrong current password"),
        (status = 403, description = "Not your account"),
        (status = 422, description = "Invalid input")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    if claims.sub != user_id {
        return Err(ApiError::forbidden("You can only update your own account"));
    }

    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut update = UserUpdate::new();

    if let Some(email) = req.email {
        let email = email.trim().to_string();
        validation::validate_email(&email).map_err(|e| ApiError::unprocessable(e.to_string()))?;
        update = update.email((!email.is_empty()).then_some(email));
    }

    if let Some(full_name) = req.full_name {
        let full_name = full_name.trim().to_string();
        validation::validate_full_name(&full_name)
            .map_err(|e| ApiError::unprocessable(e.to_string()))?;
        update = update.full_name((!full_name.is_empty()).then_some(full_name));
    }

    if let Some(new_password) = req.new_password {
        let current = req
            .current_password
            .ok_or_else(|| ApiError::bad_request("Current password is required"))?;
        state
            .hasher
            .verify(&current, &user.password)
            .map_err(|_| ApiError::unauthorized("Current password is incorrect"))?;
        validation::validate_new_password(&new_password, Some(&user.username))
            .map_err(|e| ApiError::unprocessable(e.to_string()))?;

        let hash = state.hasher.hash(&new_password).map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to update password")
        })?;
        update = update.password(hash);
    }

    if update.is_empty() {
        return Ok(Json(ApiResponse::new(user.into())));
    }

    let updated = repo
        .update(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    tracing::info!(user_id, "User profile updated");

    Ok(Json(ApiResponse::new(updated.into())))
}

//! Cloud disk handlers for Web API.
//!
//! Every route acts for the authenticated user; paths are logical paths
//! relative to that user's storage root.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::cloud::{disk_partitions, MountInfo, UploadedFile};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DeleteResponse, FolderCreatedResponse, ListFilesQuery,
    ListingResponse, MountRequest, MountResponse, PartitionsResponse, UploadResponse,
    ValidatePathRequest, ValidatePathResponse, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorCode};
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// The plain `filename` parameter is an ASCII-only fallback; the exact
/// name travels in an RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let needs_encoding = !filename.is_ascii()
        || filename.chars().any(|c| c.is_control() || c == '"' || c == '\\');

    if !needs_encoding {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            _ => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// Map a multipart read error, keeping body-limit rejections distinct.
fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload rejected: {}", e);
        return ApiError::new(ErrorCode::PayloadTooLarge, "Upload exceeds the size limit");
    }
    tracing::warn!("Failed to read multipart data: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// Join a directory's logical path and a child name.
fn join_logical(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// GET /api/cloud/files - List a directory.
#[utoipa::path(
    get,
    path = "/cloud/files",
    tag = "cloud",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Directory listing", body = ListingResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path outside storage root"),
        (status = 404, description = "Path not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    let listing = state.browser.list(&claims.username, &query.path).await?;
    Ok(Json(ApiResponse::new(listing.into())))
}

/// POST /api/cloud/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/cloud/folders",
    tag = "cloud",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderCreatedResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path outside storage root"),
        (status = 422, description = "Invalid folder name")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderCreatedResponse>>), ApiError> {
    let folder_name = req.folder_name.trim();
    state
        .browser
        .create_folder(&claims.username, &req.path, folder_name)
        .await?;

    let response = FolderCreatedResponse {
        path: join_logical(&req.path, folder_name),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/cloud/upload - Upload files.
///
/// Multipart form with an optional `path` text field and one or more
/// `files` (or `file`) parts. Each file gets its own result.
#[utoipa::path(
    post,
    path = "/cloud/upload",
    tag = "cloud",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "`path` field and `files` parts"
    ),
    responses(
        (status = 200, description = "Per-file results", body = UploadResponse),
        (status = 400, description = "No files in request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path outside storage root"),
        (status = 413, description = "Upload too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut path = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or("") {
            "path" => {
                path = field.text().await.map_err(multipart_error)?;
            }
            "files" | "file" => {
                let name = field.file_name().unwrap_or("").to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                files.push(UploadedFile::new(name, content.to_vec()));
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let outcomes = state
        .browser
        .upload(&claims.username, &path, files)
        .await?;
    let response = UploadResponse::new(path, outcomes);
    tracing::info!(
        user = %claims.username,
        stored = response.stored,
        failed = response.failed,
        "Upload finished"
    );

    Ok(Json(ApiResponse::new(response)))
}

/// GET /api/cloud/download/*path - Download a file.
#[utoipa::path(
    get,
    path = "/cloud/download/{path}",
    tag = "cloud",
    params(
        ("path" = String, Path, description = "Logical file path")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path outside storage root"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(path): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let download = state.browser.download(&claims.username, &path).await?;

    let content_type = mime_guess::from_path(&download.file_name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&download.file_name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/cloud/files/*path - Delete a file or directory.
#[utoipa::path(
    delete,
    path = "/cloud/files/{path}",
    tag = "cloud",
    params(
        ("path" = String, Path, description = "Logical path to delete")
    ),
    responses(
        (status = 200, description = "Deleted, or nothing to delete", body = DeleteResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path outside storage root or protected")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let outcome = state.browser.delete(&claims.username, &path).await?;
    Ok(Json(ApiResponse::new(outcome.into())))
}

/// GET /api/cloud/mount - Current storage root.
#[utoipa::path(
    get,
    path = "/cloud/mount",
    tag = "cloud",
    responses(
        (status = 200, description = "Storage root", body = MountResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_mount(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MountResponse>>, ApiError> {
    let info = state.browser.current_root(&claims.username).await?;
    Ok(Json(ApiResponse::new(info.into())))
}

/// PUT /api/cloud/mount - Change the storage root.
#[utoipa::path(
    put,
    path = "/cloud/mount",
    tag = "cloud",
    request_body = MountRequest,
    responses(
        (status = 200, description = "Storage root changed", body = MountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path not allowed"),
        (status = 422, description = "Invalid path")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_mount(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<MountRequest>,
) -> Result<Json<ApiResponse<MountResponse>>, ApiError> {
    let root_path = state
        .browser
        .set_mount_path(&claims.username, &req.mount_path)
        .await?;

    let info = MountInfo {
        root_path,
        is_custom: true,
    };
    Ok(Json(ApiResponse::new(info.into())))
}

/// POST /api/cloud/validate-path - Check that a server path exists.
#[utoipa::path(
    post,
    path = "/cloud/validate-path",
    tag = "cloud",
    request_body = ValidatePathRequest,
    responses(
        (status = 200, description = "Existence check", body = ValidatePathResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn validate_path(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ValidatedJson(req): ValidatedJson<ValidatePathRequest>,
) -> Json<ApiResponse<ValidatePathResponse>> {
    let exists = state.browser.validate_path(&req.path).await;
    Json(ApiResponse::new(ValidatePathResponse { exists }))
}

/// GET /api/cloud/partitions - Disk partitions on the server.
#[utoipa::path(
    get,
    path = "/cloud/partitions",
    tag = "cloud",
    responses(
        (status = 200, description = "Partitions", body = PartitionsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn partitions(AuthUser(_claims): AuthUser) -> Json<ApiResponse<PartitionsResponse>> {
    Json(ApiResponse::new(PartitionsResponse {
        partitions: disk_partitions(),
    }))
}

//! Device registry handlers for Web API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    DeviceRepository, DeviceStatus, DeviceTypeRepository, DeviceTypeUpdate, DeviceUpdate,
    NewDevice, NewDeviceType, StatusReport,
};
use crate::web::dto::{
    ApiResponse, CreateDeviceRequest, CreateDeviceTypeRequest, DeviceListQuery, DeviceResponse,
    DeviceStatusRequest, DeviceTypeResponse, MergePrivateDataRequest, PaginatedResponse,
    PaginationQuery, UpdateDeviceRequest, UpdateDeviceTypeRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

fn parse_status(value: &str) -> Result<DeviceStatus, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::unprocessable(format!("Unknown device status: {value}")))
}

/// Trimmed value, or `None` when it is blank.
fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

async fn ensure_type_exists(state: &AppState, device_type_id: i64) -> Result<(), ApiError> {
    DeviceTypeRepository::new(state.db.pool())
        .get_by_id(device_type_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::bad_request(format!("Device type {device_type_id} does not exist")))
}

// ============================================================================
// Device types
// ============================================================================

/// POST /api/devices/types - Create a device type.
#[utoipa::path(
    post,
    path = "/devices/types",
    tag = "devices",
    request_body = CreateDeviceTypeRequest,
    responses(
        (status = 201, description = "Device type created", body = DeviceTypeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Name already exists"),
        (status = 422, description = "Invalid input")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_device_type(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateDeviceTypeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceTypeResponse>>), ApiError> {
    let repo = DeviceTypeRepository::new(state.db.pool());
    let name = req.name.trim().to_string();

    if repo.get_by_name(&name).await?.is_some() {
        return Err(ApiError::conflict(format!("Device type '{name}' already exists")));
    }

    let mut new_type = NewDeviceType::new(name);
    if let Some(description) = req.description.and_then(non_blank) {
        new_type = new_type.with_description(description);
    }
    if let Some(icon) = req.icon.and_then(non_blank) {
        new_type = new_type.with_icon(icon);
    }

    let device_type = repo.create(&new_type).await?;
    tracing::info!(device_type_id = device_type.id, name = %device_type.name, "Device type created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(device_type.into()))))
}

/// GET /api/devices/types - List device types (paginated).
#[utoipa::path(
    get,
    path = "/devices/types",
    tag = "devices",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of device types", body = Vec<DeviceTypeResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_device_types(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<DeviceTypeResponse>>, ApiError> {
    let (offset, limit) = pagination.to_offset_limit();
    let repo = DeviceTypeRepository::new(state.db.pool());

    let types = repo.list(offset, limit).await?;
    let total = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        types.into_iter().map(Into::into).collect(),
        pagination.page.max(1),
        limit as u32,
        total as u64,
    )))
}

/// GET /api/devices/types/:id - Get a device type.
#[utoipa::path(
    get,
    path = "/devices/types/{id}",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device type ID")
    ),
    responses(
        (status = 200, description = "Device type", body = DeviceTypeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device type not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_device_type(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(type_id): Path<i64>,
) -> Result<Json<ApiResponse<DeviceTypeResponse>>, ApiError> {
    let device_type = DeviceTypeRepository::new(state.db.pool())
        .get_by_id(type_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Device type not found"))?;

    Ok(Json(ApiResponse::new(device_type.into())))
}

/// PUT /api/devices/types/:id - Update a device type.
#[utoipa::path(
    put,
    path = "/devices/types/{id}",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device type ID")
    ),
    request_body = UpdateDeviceTypeRequest,
    responses(
        (status = 200, description = "Device type updated", body = DeviceTypeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device type not found"),
        (status = 409, description = "Name already exists"),
        (status = 422, description = "Invalid input")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_device_type(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(type_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateDeviceTypeRequest>,
) -> Result<Json<ApiResponse<DeviceTypeResponse>>, ApiError> {
    let repo = DeviceTypeRepository::new(state.db.pool());
    let mut update = DeviceTypeUpdate::new();

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if let Some(existing) = repo.get_by_name(&name).await? {
            if existing.id != type_id {
                return Err(ApiError::conflict(format!("Device type '{name}' already exists")));
            }
        }
        update = update.name(name);
    }
    if let Some(description) = req.description {
        update = update.description(non_blank(description));
    }
    if let Some(icon) = req.icon {
        update = update.icon(non_blank(icon));
    }

    let device_type = repo
        .update(type_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Device type not found"))?;
    tracing::info!(device_type_id = type_id, "Device type updated");

    Ok(Json(ApiResponse::new(device_type.into())))
}

/// DELETE /api/devices/types/:id - Delete an unused device type.
#[utoipa::path(
    delete,
    path = "/devices/types/{id}",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device type ID")
    ),
    responses(
        (status = 200, description = "Device type deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device type not found"),
        (status = 409, description = "Devices still use this type")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_device_type(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(type_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let repo = DeviceTypeRepository::new(state.db.pool());

    if repo.get_by_id(type_id).await?.is_none() {
        return Err(ApiError::not_found("Device type not found"));
    }
    let in_use = repo.device_count(type_id).await?;
    if in_use > 0 {
        return Err(ApiError::conflict(format!(
            "Device type is used by {in_use} device(s)"
        )));
    }

    repo.delete(type_id).await?;
    tracing::info!(device_type_id = type_id, "Device type deleted");

    Ok(Json(ApiResponse::new(())))
}

// ============================================================================
// Devices
// ============================================================================

/// POST /api/devices - Register a device.
#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    request_body = CreateDeviceRequest,
    responses(
        (status = 201, description = "Device registered", body = DeviceResponse),
        (status = 400, description = "Unknown device type"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Device ID already registered"),
        (status = 422, description = "Invalid input")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceResponse>>), ApiError> {
    let repo = DeviceRepository::new(state.db.pool());
    let device_uid = req.device_uid.trim().to_string();

    if repo.uid_exists(&device_uid).await? {
        return Err(ApiError::conflict(format!(
            "Device ID '{device_uid}' is already registered"
        )));
    }
    ensure_type_exists(&state, req.device_type_id).await?;

    let mut new_device = NewDevice::new(device_uid, req.name.trim(), req.device_type_id)
        .with_private_data(req.private_data);
    if let Some(version) = req.firmware_version {
        new_device = new_device.with_firmware_version(version.trim());
    }

    let device = repo.create(&new_device).await?;
    tracing::info!(device_id = device.id, device_uid = %device.device_uid, "Device registered");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(device.into()))))
}

/// GET /api/devices - List devices (paginated), optionally by type.
#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    params(DeviceListQuery),
    responses(
        (status = 200, description = "List of devices", body = Vec<DeviceResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Query(query): Query<DeviceListQuery>,
) -> Result<Json<PaginatedResponse<DeviceResponse>>, ApiError> {
    let (offset, limit) = query.pagination().to_offset_limit();
    let repo = DeviceRepository::new(state.db.pool());

    let devices = repo.list(query.device_type_id, offset, limit).await?;
    let total = repo.count(query.device_type_id).await?;

    Ok(Json(PaginatedResponse::new(
        devices.into_iter().map(Into::into).collect(),
        query.page.max(1),
        limit as u32,
        total as u64,
    )))
}

/// GET /api/devices/:id - Get a device.
#[utoipa::path(
    get,
    path = "/devices/{id}",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device", body = DeviceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(device_id): Path<i64>,
) -> Result<Json<ApiResponse<DeviceResponse>>, ApiError> {
    let device = DeviceRepository::new(state.db.pool())
        .get_by_id(device_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;

    Ok(Json(ApiResponse::new(device.into())))
}

/// GET /api/devices/by-uid/:device_uid - Look a device up by its own identifier.
#[utoipa::path(
    get,
    path = "/devices/by-uid/{device_uid}",
    tag = "devices",
    params(
        ("device_uid" = String, Path, description = "Identifier the device reports")
    ),
    responses(
        (status = 200, description = "Device", body = DeviceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_device_by_uid(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(device_uid): Path<String>,
) -> Result<Json<ApiResponse<DeviceResponse>>, ApiError> {
    let device = DeviceRepository::new(state.db.pool())
        .get_by_uid(&device_uid)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;

    Ok(Json(ApiResponse::new(device.into())))
}

/// PUT /api/devices/:id - Update a device.
#[utoipa::path(
    put,
    path = "/devices/{id}",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    request_body = UpdateDeviceRequest,
    responses(
        (status = 200, description = "Device updated", body = DeviceResponse),
        (status = 400, description = "Unknown device type"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Invalid input")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(device_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateDeviceRequest>,
) -> Result<Json<ApiResponse<DeviceResponse>>, ApiError> {
    let mut update = DeviceUpdate::new();

    if let Some(name) = req.name {
        update = update.name(name.trim());
    }
    if let Some(type_id) = req.device_type_id {
        ensure_type_exists(&state, type_id).await?;
        update = update.device_type_id(type_id);
    }
    if let Some(status) = req.status {
        update = update.status(parse_status(&status)?);
    }
    if let Some(data) = req.private_data {
        update = update.private_data(data);
    }
    if let Some(version) = req.firmware_version {
        update = update.firmware_version(non_blank(version));
    }

    let device = DeviceRepository::new(state.db.pool())
        .update(device_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;
    tracing::info!(device_id, "Device updated");

    Ok(Json(ApiResponse::new(device.into())))
}

/// PUT /api/devices/:id/status - Record a status report.
#[utoipa::path(
    put,
    path = "/devices/{id}/status",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    request_body = DeviceStatusRequest,
    responses(
        (status = 200, description = "Status recorded", body = DeviceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Unknown status")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_device_status(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(device_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<DeviceStatusRequest>,
) -> Result<Json<ApiResponse<DeviceResponse>>, ApiError> {
    let report = StatusReport {
        status: parse_status(&req.status)?,
        is_online: req.is_online,
        last_online: req
            .last_online
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
    };

    let device = DeviceRepository::new(state.db.pool())
        .update_status(device_id, &report)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;
    tracing::debug!(device_id, status = %report.status, online = report.is_online, "Device status recorded");

    Ok(Json(ApiResponse::new(device.into())))
}

/// PATCH /api/devices/:id/private-data - Merge keys into a device's private data.
#[utoipa::path(
    patch,
    path = "/devices/{id}/private-data",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    request_body = MergePrivateDataRequest,
    responses(
        (status = 200, description = "Private data merged", body = DeviceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn merge_device_private_data(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(device_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MergePrivateDataRequest>,
) -> Result<Json<ApiResponse<DeviceResponse>>, ApiError> {
    let device = DeviceRepository::new(state.db.pool())
        .merge_private_data(device_id, &req.private_data)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;

    Ok(Json(ApiResponse::new(device.into())))
}

/// DELETE /api/devices/:id - Delete a device.
#[utoipa::path(
    delete,
    path = "/devices/{id}",
    tag = "devices",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Device not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(device_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let removed = DeviceRepository::new(state.db.pool())
        .delete(device_id)
        .await?;
    if !removed {
        return Err(ApiError::not_found("Device not found"));
    }
    tracing::info!(device_id, "Device deleted");

    Ok(Json(ApiResponse::new(())))
}

//! Request DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{no_control_chars, single_line};
use crate::db::PrivateData;

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, max = 32, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

/// Account creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Profile update request.
///
/// Omitted fields are left unchanged; an empty string clears email or full
/// name. Changing the password requires the current one.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Pagination query parameters.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl PaginationQuery {
    /// Convert to SQL offset and limit, clamping out-of-range values.
    pub fn to_offset_limit(&self) -> (i64, i64) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, 100);
        (((page - 1) as i64) * per_page as i64, per_page as i64)
    }
}

/// Directory listing query.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Logical path relative to the storage root; empty for the root.
    #[serde(default)]
    pub path: String,
}

/// Folder creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    /// Directory to create the folder in.
    #[serde(default)]
    pub path: String,
    /// Name of the new folder.
    #[validate(
        length(min = 1, max = 255, message = "Folder name must be 1-255 characters"),
        custom(function = "single_line")
    )]
    pub folder_name: String,
}

/// Mount path change request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MountRequest {
    /// Absolute directory to use as the storage root.
    #[validate(
        length(min = 1, max = 4096, message = "Mount path must be 1-4096 characters"),
        custom(function = "single_line")
    )]
    pub mount_path: String,
}

/// Path existence check request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidatePathRequest {
    #[validate(length(max = 4096))]
    pub path: String,
}

/// Device type creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeviceTypeRequest {
    #[validate(
        length(min = 1, max = 64, message = "Name must be 1-64 characters"),
        custom(function = "single_line")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500), custom(function = "no_control_chars"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 64), custom(function = "no_control_chars"))]
    pub icon: Option<String>,
}

/// Device type update request.
///
/// Omitted fields are left unchanged; an empty description or icon clears it.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDeviceTypeRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 64, message = "Name must be 1-64 characters"),
        custom(function = "single_line")
    )]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500), custom(function = "no_control_chars"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 64), custom(function = "no_control_chars"))]
    pub icon: Option<String>,
}

/// Device list query.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DeviceListQuery {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Only devices of this type.
    #[serde(default)]
    pub device_type_id: Option<i64>,
}

impl DeviceListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Device registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeviceRequest {
    /// Identifier the device reports itself with.
    #[validate(
        length(min = 1, max = 64, message = "Device ID must be 1-64 characters"),
        custom(function = "single_line")
    )]
    pub device_uid: String,
    #[validate(
        length(min = 1, max = 64, message = "Name must be 1-64 characters"),
        custom(function = "single_line")
    )]
    pub name: String,
    pub device_type_id: i64,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub private_data: PrivateData,
    #[serde(default)]
    #[validate(length(max = 64), custom(function = "single_line"))]
    pub firmware_version: Option<String>,
}

/// Device update request.
///
/// `private_data` replaces the stored object. An empty firmware version
/// clears it.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDeviceRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 64, message = "Name must be 1-64 characters"),
        custom(function = "single_line")
    )]
    pub name: Option<String>,
    #[serde(default)]
    pub device_type_id: Option<i64>,
    /// `active`, `inactive`, `maintenance` or `error`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub private_data: Option<PrivateData>,
    #[serde(default)]
    #[validate(length(max = 64), custom(function = "no_control_chars"))]
    pub firmware_version: Option<String>,
}

/// Device status report.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeviceStatusRequest {
    /// `active`, `inactive`, `maintenance` or `error`.
    pub status: String,
    pub is_online: bool,
    /// Report time; the server time when omitted.
    #[serde(default)]
    pub last_online: Option<DateTime<Utc>>,
}

/// Keys to merge into a device's private data.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MergePrivateDataRequest {
    #[schema(value_type = Object)]
    pub private_data: PrivateData,
}

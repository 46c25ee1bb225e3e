//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::cloud::{
    Breadcrumb, DeleteOutcome, DirectoryEntry, Listing, MountInfo, UploadOutcome, UploadStatus,
};
use crate::db::{Device, DeviceType, PrivateData, User};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    /// Response data.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Create a new paginated response.
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        Self {
            data,
            meta: PaginationMeta {
                page,
                per_page,
                total,
            },
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u64,
}

// ============================================================================
// Auth / User DTOs
// ============================================================================

/// Login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Access token (JWT), also set as the session cookie.
    pub access_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    /// User information.
    pub user: UserResponse,
}

/// User information in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login_at: user.last_login,
        }
    }
}

// ============================================================================
// Cloud DTOs
// ============================================================================

/// One entry of a directory listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileEntryResponse {
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes; absent for directories.
    pub size: Option<u64>,
    pub modified: DateTime<Utc>,
    /// Path relative to the storage root.
    pub path: String,
}

impl From<DirectoryEntry> for FileEntryResponse {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            name: entry.name,
            is_dir: entry.is_dir,
            size: entry.size,
            modified: entry.modified,
            path: entry.path,
        }
    }
}

/// Breadcrumb segment.
#[derive(Debug, Serialize, ToSchema)]
pub struct BreadcrumbResponse {
    pub name: String,
    pub path: String,
}

impl From<Breadcrumb> for BreadcrumbResponse {
    fn from(crumb: Breadcrumb) -> Self {
        Self {
            name: crumb.name,
            path: crumb.path,
        }
    }
}

/// Directory listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListingResponse {
    pub entries: Vec<FileEntryResponse>,
    pub breadcrumbs: Vec<BreadcrumbResponse>,
    pub parent_path: String,
    pub current_path: String,
    pub root_path: String,
    pub disk_partitions: Vec<String>,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            entries: listing.entries.into_iter().map(Into::into).collect(),
            breadcrumbs: listing.breadcrumbs.into_iter().map(Into::into).collect(),
            parent_path: listing.parent_path,
            current_path: listing.current_path,
            root_path: listing.root_path,
            disk_partitions: listing.disk_partitions,
        }
    }
}

/// Folder creation result.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderCreatedResponse {
    /// Logical path of the folder.
    pub path: String,
}

/// Result for one uploaded file.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResultItem {
    pub name: String,
    /// `stored` or `failed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Error kind when the file failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<UploadOutcome> for UploadResultItem {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome.status {
            UploadStatus::Stored { size } => Self {
                name: outcome.name,
                status: "stored".to_string(),
                size: Some(size),
                error: None,
            },
            UploadStatus::Failed(err) => Self {
                name: outcome.name,
                status: "failed".to_string(),
                size: None,
                error: Some(err.kind().to_string()),
            },
        }
    }
}

/// Upload batch result.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Directory the files went to.
    pub path: String,
    pub stored: usize,
    pub failed: usize,
    pub files: Vec<UploadResultItem>,
}

impl UploadResponse {
    pub fn new(path: String, outcomes: Vec<UploadOutcome>) -> Self {
        let files: Vec<UploadResultItem> = outcomes.into_iter().map(Into::into).collect();
        let stored = files.iter().filter(|f| f.status == "stored").count();
        Self {
            path,
            stored,
            failed: files.len() - stored,
            files,
        }
    }
}

/// Delete result.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    /// Directory to navigate back to.
    pub parent_path: String,
    /// `false` when nothing existed at the path.
    pub removed: bool,
}

impl From<DeleteOutcome> for DeleteResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            parent_path: outcome.parent_path,
            removed: outcome.removed,
        }
    }
}

/// Current storage root.
#[derive(Debug, Serialize, ToSchema)]
pub struct MountResponse {
    pub root_path: String,
    /// Whether the user mounted this root themselves.
    pub is_custom: bool,
    pub disk_partitions: Vec<String>,
}

impl From<MountInfo> for MountResponse {
    fn from(info: MountInfo) -> Self {
        Self {
            root_path: info.root_path.to_string_lossy().into_owned(),
            is_custom: info.is_custom,
            disk_partitions: crate::cloud::disk_partitions(),
        }
    }
}

/// Path existence check result.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidatePathResponse {
    pub exists: bool,
}

/// Disk partitions.
#[derive(Debug, Serialize, ToSchema)]
pub struct PartitionsResponse {
    pub partitions: Vec<String>,
}

// ============================================================================
// Device DTOs
// ============================================================================

/// Device type information in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceTypeResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DeviceType> for DeviceTypeResponse {
    fn from(device_type: DeviceType) -> Self {
        Self {
            id: device_type.id,
            name: device_type.name,
            description: device_type.description,
            icon: device_type.icon,
            created_at: device_type.created_at,
            updated_at: device_type.updated_at,
        }
    }
}

/// Device information in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceResponse {
    pub id: i64,
    pub device_uid: String,
    pub name: String,
    pub device_type_id: i64,
    pub device_type: Option<DeviceTypeResponse>,
    pub status: String,
    #[schema(value_type = Object)]
    pub private_data: PrivateData,
    pub firmware_version: Option<String>,
    pub last_online: Option<String>,
    pub is_online: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            device_uid: device.device_uid,
            name: device.name,
            device_type_id: device.device_type_id,
            device_type: device.device_type.map(Into::into),
            status: device.status.to_string(),
            private_data: device.private_data,
            firmware_version: device.firmware_version,
            last_online: device.last_online,
            is_online: device.is_online,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

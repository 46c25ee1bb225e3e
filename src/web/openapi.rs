//! OpenAPI document for the Web API.

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    BreadcrumbResponse, CreateDeviceRequest, CreateDeviceTypeRequest, CreateFolderRequest,
    CreateUserRequest, DeleteResponse, DeviceResponse, DeviceStatusRequest, DeviceTypeResponse,
    FileEntryResponse, FolderCreatedResponse, ListingResponse, LoginRequest, LoginResponse,
    MergePrivateDataRequest, MountRequest, MountResponse, PaginationMeta, PartitionsResponse,
    UpdateDeviceRequest, UpdateDeviceTypeRequest, UpdateUserRequest, UploadResponse,
    UploadResultItem, UserResponse, ValidatePathRequest, ValidatePathResponse,
};
use super::handlers;

/// Registers the `bearer_auth` scheme referenced by protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "devcloud API", description = "Per-user scoped cloud disk"),
    servers((url = "/api")),
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::user::create_user,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::update_user,
        handlers::cloud::list_files,
        handlers::cloud::create_folder,
        handlers::cloud::upload_files,
        handlers::cloud::download_file,
        handlers::cloud::delete_entry,
        handlers::cloud::get_mount,
        handlers::cloud::set_mount,
        handlers::cloud::validate_path,
        handlers::cloud::partitions,
        handlers::device::create_device_type,
        handlers::device::list_device_types,
        handlers::device::get_device_type,
        handlers::device::update_device_type,
        handlers::device::delete_device_type,
        handlers::device::create_device,
        handlers::device::list_devices,
        handlers::device::get_device,
        handlers::device::get_device_by_uid,
        handlers::device::update_device,
        handlers::device::update_device_status,
        handlers::device::merge_device_private_data,
        handlers::device::delete_device,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        UserResponse,
        CreateUserRequest,
        UpdateUserRequest,
        PaginationMeta,
        ListingResponse,
        FileEntryResponse,
        BreadcrumbResponse,
        CreateFolderRequest,
        FolderCreatedResponse,
        UploadResponse,
        UploadResultItem,
        DeleteResponse,
        MountRequest,
        MountResponse,
        ValidatePathRequest,
        ValidatePathResponse,
        PartitionsResponse,
        DeviceTypeResponse,
        CreateDeviceTypeRequest,
        UpdateDeviceTypeRequest,
        DeviceResponse,
        CreateDeviceRequest,
        UpdateDeviceRequest,
        DeviceStatusRequest,
        MergePrivateDataRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and session"),
        (name = "users", description = "Accounts"),
        (name = "cloud", description = "Cloud disk"),
        (name = "devices", description = "Device registry")
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

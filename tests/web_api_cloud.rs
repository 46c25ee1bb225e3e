//! Web API Cloud Disk Tests
//!
//! Integration tests for listing, folders, upload, download, delete and
//! mount endpoints.

mod common;

use std::fs;

use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use common::{create_test_app, create_test_app_with, test_router_config};
use serde_json::{json, Value};
use tempfile::TempDir;

fn text_part(name: &str, content: &str) -> Part {
    Part::bytes(content.as_bytes().to_vec())
        .file_name(name)
        .mime_type("text/plain")
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_cloud_routes_require_auth() {
    let app = create_test_app().await;

    app.server
        .get("/api/cloud/files")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/api/cloud/download/a.txt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .delete("/api/cloud/files/a.txt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .put("/api/cloud/mount")
        .json(&json!({ "mount_path": "/tmp" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_empty_root() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let response = app
        .server
        .get("/api/cloud/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["entries"], json!([]));
    assert_eq!(body["data"]["breadcrumbs"], json!([]));
    assert_eq!(body["data"]["current_path"], "");
    assert_eq!(body["data"]["parent_path"], "");
    assert!(body["data"]["disk_partitions"].is_array());
}

#[tokio::test]
async fn test_list_orders_directories_first() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    fs::write(app.root_path().join("a.txt"), "a").unwrap();
    fs::create_dir(app.root_path().join("zeta")).unwrap();
    fs::create_dir(app.root_path().join("Beta")).unwrap();
    fs::write(app.root_path().join("pagefile.sys"), "x").unwrap();

    let body: Value = app
        .server
        .get("/api/cloud/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();

    let entries = body["data"]["entries"].as_array().unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Beta", "zeta", "a.txt"]);

    assert!(entries[0]["size"].is_null());
    assert_eq!(entries[2]["size"], 1);
    assert_eq!(entries[2]["path"], "a.txt");
}

#[tokio::test]
async fn test_list_nested_breadcrumbs() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    fs::create_dir_all(app.root_path().join("projects/rust")).unwrap();

    let body: Value = app
        .server
        .get("/api/cloud/files")
        .add_query_param("path", "projects/rust")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();

    assert_eq!(body["data"]["current_path"], "projects/rust");
    assert_eq!(body["data"]["parent_path"], "projects");
    assert_eq!(
        body["data"]["breadcrumbs"],
        json!([
            { "name": "projects", "path": "projects" },
            { "name": "rust", "path": "projects/rust" }
        ])
    );
}

#[tokio::test]
async fn test_list_escape_denied() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let response = app
        .server
        .get("/api/cloud/files")
        .add_query_param("path", "../")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_list_missing_directory() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    app.server
        .get("/api/cloud/files")
        .add_query_param("path", "nope")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Folders
// ============================================================================

#[tokio::test]
async fn test_create_folder() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let response = app
        .server
        .post("/api/cloud/folders")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "path": "", "folder_name": "reports" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["path"], "reports");
    assert!(app.root_path().join("reports").is_dir());

    // Creating it again is not an error
    app.server
        .post("/api/cloud/folders")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "path": "", "folder_name": "reports" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_folder_rejects_nested_name() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    app.server
        .post("/api/cloud/folders")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "path": "", "folder_name": "../outside" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/api/cloud/folders")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "path": "", "folder_name": "" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Upload / download
// ============================================================================

#[tokio::test]
async fn test_upload_and_download() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let form = MultipartForm::new()
        .add_text("path", "inbox")
        .add_part("files", text_part("notes.txt", "hello"))
        .add_part("files", text_part("todo.txt", "world!"));

    let response = app
        .server
        .post("/api/cloud/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["path"], "inbox");
    assert_eq!(body["data"]["stored"], 2);
    assert_eq!(body["data"]["failed"], 0);
    assert_eq!(body["data"]["files"][1]["size"], 6);
    assert_eq!(
        fs::read_to_string(app.root_path().join("inbox/notes.txt")).unwrap(),
        "hello"
    );

    let response = app
        .server
        .get("/api/cloud/download/inbox/notes.txt")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello");
    assert_eq!(
        response.header(CONTENT_DISPOSITION),
        "attachment; filename=\"notes.txt\""
    );
    assert!(response
        .header(CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_upload_strips_client_directories() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let form = MultipartForm::new().add_part("files", text_part("../../evil.txt", "x"));

    let response = app
        .server
        .post("/api/cloud/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["files"][0]["name"], "evil.txt");
    assert!(app.root_path().join("evil.txt").is_file());
}

#[tokio::test]
async fn test_upload_reports_unusable_names() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let form = MultipartForm::new()
        .add_part("files", text_part("..", "x"))
        .add_part("files", text_part("ok.txt", "x"));

    let body: Value = app
        .server
        .post("/api/cloud/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await
        .json();

    assert_eq!(body["data"]["stored"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["files"][0]["status"], "failed");
    assert_eq!(body["data"]["files"][0]["error"], "path_denied");
}

#[tokio::test]
async fn test_upload_escape_denied() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let form = MultipartForm::new()
        .add_text("path", "../escape")
        .add_part("files", text_part("a.txt", "x"));

    app.server
        .post("/api/cloud/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert!(!app.root_path().parent().unwrap().join("escape").exists());
}

#[tokio::test]
async fn test_upload_without_files() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let form = MultipartForm::new().add_text("path", "inbox");

    app.server
        .post("/api/cloud/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_too_large() {
    let mut config = test_router_config();
    config.max_upload_bytes = 1024;
    let app = create_test_app_with(config).await;
    let token = app.signup("alice").await;

    let form = MultipartForm::new().add_part(
        "files",
        Part::bytes(vec![b'x'; 4096]).file_name("big.bin"),
    );

    app.server
        .post("/api/cloud/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    assert!(!app.root_path().join("big.bin").exists());
}

#[tokio::test]
async fn test_download_missing_and_directory() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    fs::create_dir(app.root_path().join("docs")).unwrap();

    app.server
        .get("/api/cloud/download/missing.txt")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get("/api/cloud/download/docs")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_encoded_escape_denied() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    // Decodes to `../devcloud-secret.txt` only after the second pass
    let response = app
        .server
        .get("/api/cloud/download/%252E%252E%252Fdevcloud-secret.txt")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_non_ascii_name() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    fs::write(app.root_path().join("报告.txt"), "data").unwrap();

    let response = app
        .server
        .get("/api/cloud/download/%E6%8A%A5%E5%91%8A.txt")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    let disposition = response.header(CONTENT_DISPOSITION);
    assert!(disposition
        .to_str()
        .unwrap()
        .contains("filename*=UTF-8''%E6%8A%A5%E5%91%8A.txt"));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_file_and_directory() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    fs::create_dir_all(app.root_path().join("old/deep")).unwrap();
    fs::write(app.root_path().join("old/deep/a.txt"), "a").unwrap();
    fs::write(app.root_path().join("old/b.txt"), "b").unwrap();

    let response = app
        .server
        .delete("/api/cloud/files/old/b.txt")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["parent_path"], "old");
    assert_eq!(body["data"]["removed"], true);

    let body: Value = app
        .server
        .delete("/api/cloud/files/old")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(body["data"]["parent_path"], "");
    assert!(!app.root_path().join("old").exists());

    // Already gone
    let body: Value = app
        .server
        .delete("/api/cloud/files/old")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(body["data"]["removed"], false);
}

#[tokio::test]
async fn test_delete_reserved_name_denied() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    fs::create_dir(app.root_path().join("$RECYCLE.BIN")).unwrap();

    app.server
        .delete("/api/cloud/files/$RECYCLE.BIN")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert!(app.root_path().join("$RECYCLE.BIN").exists());
}

// ============================================================================
// Mount
// ============================================================================

#[tokio::test]
async fn test_mount_changes_root_per_user() {
    let app = create_test_app().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let mount = TempDir::new().unwrap();
    fs::write(mount.path().join("mine.txt"), "m").unwrap();
    fs::write(app.root_path().join("shared.txt"), "s").unwrap();

    let body: Value = app
        .server
        .get("/api/cloud/mount")
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .json();
    assert_eq!(body["data"]["is_custom"], false);

    let response = app
        .server
        .put("/api/cloud/mount")
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .json(&json!({ "mount_path": mount.path().to_str().unwrap() }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["is_custom"], true);
    assert_eq!(
        body["data"]["root_path"],
        mount.path().canonicalize().unwrap().to_str().unwrap()
    );

    let body: Value = app
        .server
        .get("/api/cloud/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .json();
    assert_eq!(body["data"]["entries"][0]["name"], "mine.txt");

    let body: Value = app
        .server
        .get("/api/cloud/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .json();
    assert_eq!(body["data"]["entries"][0]["name"], "shared.txt");
}

#[tokio::test]
async fn test_mount_creates_missing_directory() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;
    let base = TempDir::new().unwrap();
    let target = base.path().join("new/root");

    app.server
        .put("/api/cloud/mount")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "mount_path": target.to_str().unwrap() }))
        .await
        .assert_status_ok();

    assert!(target.is_dir());
}

#[tokio::test]
async fn test_mount_empty_path_rejected() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    app.server
        .put("/api/cloud/mount")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "mount_path": "" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_validate_path() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let body: Value = app
        .server
        .post("/api/cloud/validate-path")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "path": app.root_path().to_str().unwrap() }))
        .await
        .json();
    assert_eq!(body["data"]["exists"], true);

    let body: Value = app
        .server
        .post("/api/cloud/validate-path")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "path": "/definitely/not/here" }))
        .await
        .json();
    assert_eq!(body["data"]["exists"], false);
}

#[tokio::test]
async fn test_partitions() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let body: Value = app
        .server
        .get("/api/cloud/partitions")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();

    let partitions = body["data"]["partitions"].as_array().unwrap();
    assert!(!partitions.is_empty());
    #[cfg(not(windows))]
    assert_eq!(partitions[0], "/");
}

#[tokio::test]
async fn test_security_headers_on_api() {
    let app = create_test_app().await;
    let token = app.signup("alice").await;

    let response = app
        .server
        .get("/api/cloud/files")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("cache-control"), "no-store, max-age=0");
}

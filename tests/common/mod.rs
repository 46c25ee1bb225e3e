//! Test helpers for Web API integration tests.
//!
//! Builds the API router over an in-memory database and a temporary
//! default storage root.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use devcloud::config::AuthConfig;
use devcloud::web::handlers::AppState;
use devcloud::web::middleware::JwtState;
use devcloud::web::{create_router, RouterConfig};
use devcloud::{CredentialHasher, Database, ScopedFileBrowser};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const PASSWORD: &str = "password123";

/// Running API plus the resources it points at.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub root: TempDir,
}

/// Router settings with limits high enough not to interfere.
pub fn test_router_config() -> RouterConfig {
    RouterConfig {
        cors_origins: vec![],
        max_upload_bytes: 10 * 1024 * 1024,
        login_rate_limit: 100,
        api_rate_limit: 10_000,
    }
}

/// Create a test app with default settings.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(test_router_config()).await
}

/// Create a test app with custom router settings.
pub async fn create_test_app_with(config: RouterConfig) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let db = Arc::new(db);
    let root = TempDir::new().expect("Failed to create storage root");

    let browser = ScopedFileBrowser::new(db.pool().clone(), root.path());
    let hasher = CredentialHasher::new(&AuthConfig {
        password_memory_kib: 64,
        password_iterations: 1,
        password_parallelism: 1,
    })
    .expect("Failed to build password hasher");
    let app_state = Arc::new(
        AppState::new(db.clone(), browser, JWT_SECRET, 900).with_hasher(hasher),
    );
    let jwt_state = Arc::new(JwtState::new(JWT_SECRET));

    let router = create_router(app_state, jwt_state, &config);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, db, root }
}

impl TestApp {
    /// Create an account and log in, returning the access token.
    pub async fn signup(&self, username: &str) -> String {
        self.server
            .post("/api/users")
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["data"]["access_token"]
            .as_str()
            .expect("login response carries a token")
            .to_string()
    }

    /// Path of the default storage root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }
}

//! Configuration module for devcloud.

use serde::Deserialize;
use std::path::Path;

use crate::{DevcloudError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/devcloud.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// How strictly storage-root containment is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfinementPolicy {
    /// Every operation must stay inside the user's storage root.
    #[default]
    Strict,
    /// Users with a custom root may list, create folders and delete outside
    /// it. Upload and download stay confined.
    TrustCustomRoots,
}

/// Cloud disk configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    /// Storage root used by users who have not set their own.
    #[serde(default = "default_cloud_root")]
    pub default_root: String,
    /// Maximum upload request size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Containment policy.
    #[serde(default)]
    pub confinement: ConfinementPolicy,
    /// Directories a user may mount as their root. Empty allows any path.
    #[serde(default)]
    pub mount_allowlist: Vec<String>,
}

fn default_cloud_root() -> String {
    "cloud_storage".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            default_root: default_cloud_root(),
            max_upload_size_mb: default_max_upload_size(),
            confinement: ConfinementPolicy::default(),
            mount_allowlist: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/devcloud.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Name of the session cookie carrying the access token.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Rate limit for login endpoint (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_jwt_access_expiry() -> u64 {
    86400 // 1 day
}

fn default_session_cookie() -> String {
    "cloud_session".to_string()
}

fn default_login_rate_limit() -> u32 {
    5
}

fn default_api_rate_limit() -> u32 {
    300
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            session_cookie: default_session_cookie(),
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Password hashing configuration (Argon2id cost).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_password_memory")]
    pub password_memory_kib: u32,
    /// Number of passes.
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
    /// Degree of parallelism.
    #[serde(default = "default_password_parallelism")]
    pub password_parallelism: u32,
}

fn default_password_memory() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_password_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_password_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_memory_kib: default_password_memory(),
            password_iterations: default_password_iterations(),
            password_parallelism: default_password_parallelism(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cloud disk configuration.
    #[serde(default)]
    pub cloud: CloudConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Password hashing configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DevcloudError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DevcloudError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DEVCLOUD_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("DEVCLOUD_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(DevcloudError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via DEVCLOUD_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.web.session_cookie.trim().is_empty() {
            return Err(DevcloudError::Config(
                "session_cookie must not be empty".to_string(),
            ));
        }
        let auth = &self.auth;
        argon2::Params::new(
            auth.password_memory_kib,
            auth.password_iterations,
            auth.password_parallelism,
            None,
        )
        .map_err(|e| DevcloudError::Config(format!("invalid password hashing cost: {e}")))?;
        Ok(())
    }
}

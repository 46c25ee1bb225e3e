//! Account creation for devcloud.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{CredentialHasher, PasswordError};
use crate::db::{DbPool, NewUser, User, UserRepository};

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Username already exists.
    #[error("username already exists")]
    UsernameExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Account creation request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username (3-32 characters: alphanumeric, underscore, hyphen).
    pub username: String,
    /// Password (8-128 characters).
    pub password: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Optional full name.
    pub full_name: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
            full_name: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the full name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

/// Create a new user account.
///
/// This function:
/// 1. Validates all input fields
/// 2. Checks if the username already exists
/// 3. Hashes the password
/// 4. Creates the user in the database
pub async fn create_user(
    pool: &DbPool,
    hasher: &CredentialHasher,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    validate_registration(
        &request.username,
        &request.password,
        request.email.as_deref(),
        request.full_name.as_deref(),
    )?;

    let repo = UserRepository::new(pool);

    if repo
        .username_exists(&request.username)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?
    {
        return Err(RegistrationError::UsernameExists);
    }

    let password_hash = hasher.hash(&request.password)?;

    let mut new_user = NewUser::new(&request.username, password_hash);
    if let Some(email) = request.email.filter(|e| !e.is_empty()) {
        new_user = new_user.with_email(email);
    }
    if let Some(full_name) = request.full_name.filter(|n| !n.is_empty()) {
        new_user = new_user.with_full_name(full_name);
    }

    let user = repo
        .create(&new_user)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?;

    info!(
        username = %user.username,
        user_id = user.id,
        "New user created"
    );

    Ok(user)
}

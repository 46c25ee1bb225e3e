//! Credential checks for devcloud.

use tracing::{debug, info, warn};

use crate::auth::CredentialHasher;
use crate::db::{DbPool, User, UserRepository, UserUpdate};
use crate::{DevcloudError, Result};

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Authenticate a user by username and password.
///
/// Unknown users, wrong passwords and disabled accounts all produce the same
/// `DevcloudError::Auth` so callers cannot tell them apart. On success the
/// user's last login time is recorded, and a password hash made at another
/// cost is replaced by one at the hasher's cost.
pub async fn authenticate(
    pool: &DbPool,
    hasher: &CredentialHasher,
    username: &str,
    password: &str,
) -> Result<User> {
    let repo = UserRepository::new(pool);

    let Some(user) = repo.get_by_username(username).await? else {
        warn!(username = %username, "Login attempt for unknown user");
        return Err(DevcloudError::Auth(INVALID_CREDENTIALS.to_string()));
    };

    if hasher.verify(password, &user.password).is_err() {
        warn!(username = %user.username, "Login attempt with wrong password");
        return Err(DevcloudError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        warn!(username = %user.username, "Login attempt for disabled account");
        return Err(DevcloudError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    if hasher.needs_rehash(&user.password) {
        match hasher.hash(password) {
            Ok(hash) => match repo.update(user.id, &UserUpdate::new().password(hash)).await {
                Ok(_) => debug!(user_id = user.id, "Password hash upgraded"),
                Err(e) => warn!(user_id = user.id, error = %e, "Failed to store upgraded hash"),
            },
            Err(e) => warn!(user_id = user.id, error = %e, "Failed to upgrade password hash"),
        }
    }

    repo.update_last_login(user.id).await?;
    info!(username = %user.username, user_id = user.id, "User logged in");

    Ok(user)
}

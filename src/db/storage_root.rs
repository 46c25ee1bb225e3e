//! Per-user storage root mapping.

use super::DbPool;
use crate::Result;

/// A user's custom storage root.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StorageRoot {
    pub username: String,
    pub root_path: String,
    pub updated_at: String,
}

/// Repository for the username -> storage root mapping.
pub struct StorageRootRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> StorageRootRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get the custom root for a user, if one was set.
    pub async fn get(&self, username: &str) -> Result<Option<StorageRoot>> {
        let root = sqlx::query_as::<_, StorageRoot>(
            "SELECT username, root_path, updated_at FROM storage_roots WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(root)
    }

    /// Set or replace the custom root for a user.
    pub async fn set(&self, username: &str, root_path: &str) -> Result<StorageRoot> {
        let root = sqlx::query_as::<_, StorageRoot>(
            "INSERT INTO storage_roots (username, root_path) VALUES (?, ?)
             ON CONFLICT(username) DO UPDATE
                SET root_path = excluded.root_path, updated_at = datetime('now')
             RETURNING username, root_path, updated_at",
        )
        .bind(username)
        .bind(root_path)
        .fetch_one(self.pool)
        .await?;

        Ok(root)
    }
}

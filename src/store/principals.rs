use sqlx::SqlitePool;

use crate::{error::AppError, models::Principal};

/// Registered users, keyed by unique username.
#[derive(Clone)]
pub struct PrincipalStore {
    pool: SqlitePool,
}

impl PrincipalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, username: &str) -> Result<Option<Principal>, AppError> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    /// Inserts a new principal. The UNIQUE constraint on `username` is the
    /// final arbiter when two registrations race past the existence check.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<Principal, AppError> {
        if username.is_empty() || password_hash.is_empty() {
            return Err(AppError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        if self.find_by_name(username).await?.is_some() {
            return Err(username_taken());
        }

        sqlx::query_as::<_, Principal>(
            "INSERT INTO users (username, password_hash) VALUES (?, ?)
             RETURNING id, username, password_hash, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => username_taken(),
            other => AppError::StorageError(other),
        })
    }
}

fn username_taken() -> AppError {
    AppError::Conflict("Username is already taken".to_string())
}

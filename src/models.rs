use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Domain Models (Mapped to DB) ---

/// Row id of a registered user. Tasks are scoped by this value, never by
/// the username.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PrincipalId(pub i64);

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub completed: bool,
}

/// The caller identity recovered from a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal_id: PrincipalId,
    pub username: String,
}

// --- Request/Response DTOs ---

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: String,
    /// Required; `Option` so a missing flag is a validation error.
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Session token payload ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: PrincipalId,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

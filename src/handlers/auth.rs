use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{
    authenticator::Authenticator,
    error::AppError,
    extract::AppJson,
    middleware::CurrentUser,
    models::{Credentials, MessageResponse, TokenResponse},
};

#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "User registered", body = MessageResponse),
        (status = 400, description = "Missing fields or username already taken", body = crate::models::ErrorResponse),
        (status = 500, description = "Storage error", body = crate::models::ErrorResponse)
    )
)]
pub async fn register(
    State(authenticator): State<Arc<Authenticator>>,
    AppJson(payload): AppJson<Credentials>,
) -> Result<Json<MessageResponse>, AppError> {
    authenticator
        .register(&payload.username, &payload.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "User registered!".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Invalid username or password", body = crate::models::ErrorResponse)
    )
)]
pub async fn login(
    State(authenticator): State<Arc<Authenticator>>,
    AppJson(payload): AppJson<Credentials>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = authenticator
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(TokenResponse {
        message: "Login successful!".to_string(),
        token,
    }))
}

#[utoipa::path(
    post,
    path = "/refresh-token",
    tag = "auth",
    responses(
        (status = 200, description = "Token renewed", body = TokenResponse),
        (status = 401, description = "Invalid or expired token", body = crate::models::ErrorResponse),
        (status = 403, description = "Missing token", body = crate::models::ErrorResponse)
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn refresh_token(
    State(authenticator): State<Arc<Authenticator>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<TokenResponse>, AppError> {
    let token = authenticator.refresh(&session)?;

    Ok(Json(TokenResponse {
        message: "Token renewed".to_string(),
        token,
    }))
}

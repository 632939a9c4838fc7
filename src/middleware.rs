use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{authenticator::Authenticator, error::AppError, models::Session};

/// Extractor for routes that require a valid bearer token.
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Non-UTF-8 header values fail the bearer-scheme check.
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());

        let authenticator = Arc::<Authenticator>::from_ref(state);
        let session = authenticator.authenticate_request(auth_header)?;

        Ok(CurrentUser(session))
    }
}

//! Signed, time-bounded session tokens.
//!
//! Tokens are HS256 JWTs carrying `{id, username, iat, exp}`. The payload is
//! signed, not encrypted: anyone holding a token can read it with
//! [`inspect`], so nothing confidential goes in the claims.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    error::AppError,
    models::{Claims, PrincipalId, Session},
};

/// Validity window of every issued token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Clone)]
pub struct CredentialCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl CredentialCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `verify_at` against an explicit clock.
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(&self, id: PrincipalId, username: &str) -> Result<String, AppError> {
        self.issue_at(id, username, Utc::now().timestamp())
    }

    pub fn issue_at(&self, id: PrincipalId, username: &str, now: i64) -> Result<String, AppError> {
        let claims = Claims {
            id,
            username: username.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalError(format!("Token creation failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Session, AppError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Rejects bad signatures, malformed tokens and tokens whose expiry is at
    /// or before `now`, all with the same [`AppError::InvalidCredential`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Session, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!("rejected token: {}", e);
            AppError::InvalidCredential
        })?;

        if now >= data.claims.exp {
            tracing::debug!(principal = %data.claims.id, "rejected expired token");
            return Err(AppError::InvalidCredential);
        }

        Ok(Session {
            principal_id: data.claims.id,
            username: data.claims.username,
        })
    }
}

/// Decodes the claims of `token` without checking signature or expiry.
///
/// For display purposes only; never use the result for an access decision.
pub fn inspect(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidCredential)
}

//! Registration, login and bearer-token gating.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;

use crate::{
    credential::CredentialCodec,
    error::AppError,
    models::Session,
    store::PrincipalStore,
};

pub struct Authenticator {
    principals: PrincipalStore,
    codec: CredentialCodec,
    hash_params: Params,
    /// Verified against when the username is unknown, so both login failure
    /// paths cost one hash verification.
    dummy_hash: String,
}

impl Authenticator {
    pub fn new(
        principals: PrincipalStore,
        codec: CredentialCodec,
        hash_params: Params,
    ) -> Result<Self, AppError> {
        let dummy_hash = hash_with(&hash_params, "taskgate-dummy-password")?;

        Ok(Self {
            principals,
            codec,
            hash_params,
            dummy_hash,
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), AppError> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        // Cheap early exit; `create` re-checks and the UNIQUE index settles races.
        if self.principals.find_by_name(username).await?.is_some() {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let params = self.hash_params.clone();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_with(&params, &password))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))??;

        let principal = self.principals.create(username, &password_hash).await?;
        tracing::info!(principal = %principal.id, username, "registered principal");

        Ok(())
    }

    /// Returns a fresh session token. Unknown usernames and wrong passwords
    /// both fail with [`AppError::InvalidCredentials`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "Username and password must be filled in".to_string(),
            ));
        }

        let principal = self.principals.find_by_name(username).await?;
        let stored_hash = principal
            .as_ref()
            .map(|p| p.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_with(&password, &stored_hash))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        match principal {
            Some(principal) if matches => {
                tracing::debug!(principal = %principal.id, "login succeeded");
                self.codec.issue(principal.id, &principal.username)
            }
            _ => {
                tracing::debug!(username, "login rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Gate for protected operations. `header` is the raw `Authorization`
    /// value. A missing header or non-bearer scheme is [`AppError::NoCredential`];
    /// a bearer token that fails verification is [`AppError::InvalidCredential`].
    pub fn authenticate_request(&self, header: Option<&str>) -> Result<Session, AppError> {
        let header =
            header.ok_or_else(|| AppError::NoCredential("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::NoCredential("Invalid token format".to_string()))?;

        self.codec.verify(token)
    }

    /// Re-issues a token for an already authenticated caller without
    /// re-checking the password.
    pub fn refresh(&self, session: &Session) -> Result<String, AppError> {
        self.codec.issue(session.principal_id, &session.username)
    }
}

fn hash_with(params: &Params, password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Cost parameters are read from the stored PHC string.
fn verify_with(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("invalid password hash in database: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{credential, db, models::PrincipalId};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn authenticator() -> (Authenticator, PrincipalStore) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        let principals = PrincipalStore::new(pool);
        let auth = Authenticator::new(
            principals.clone(),
            CredentialCodec::new(b"test-secret"),
            Params::new(1024, 1, 1, None).unwrap(),
        )
        .unwrap();
        (auth, principals)
    }

    #[tokio::test]
    async fn register_then_login_yields_token_for_that_principal() {
        let (auth, principals) = authenticator().await;

        auth.register("alice", "pw1").await.unwrap();
        let token = auth.login("alice", "pw1").await.unwrap();

        let stored = principals.find_by_name("alice").await.unwrap().unwrap();
        assert_eq!(credential::inspect(&token).unwrap().id, stored.id);
    }

    #[tokio::test]
    async fn same_password_gets_distinct_verifiers() {
        let (auth, principals) = authenticator().await;

        auth.register("alice", "same").await.unwrap();
        auth.register("bob", "same").await.unwrap();

        let alice = principals.find_by_name("alice").await.unwrap().unwrap();
        let bob = principals.find_by_name("bob").await.unwrap().unwrap();
        assert_ne!(alice.password_hash, bob.password_hash);
        assert!(!alice.password_hash.contains("same"));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_regardless_of_password() {
        let (auth, _) = authenticator().await;

        auth.register("alice", "pw1").await.unwrap();
        assert!(matches!(
            auth.register("alice", "other").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let (auth, _) = authenticator().await;
        auth.register("alice", "pw1").await.unwrap();

        let wrong_password = auth.login("alice", "nope").await.unwrap_err();
        let unknown_user = auth.login("mallory", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_user, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn header_shapes_map_to_no_credential_or_invalid_credential() {
        let (auth, _) = authenticator().await;

        assert!(matches!(
            auth.authenticate_request(None),
            Err(AppError::NoCredential(_))
        ));
        assert!(matches!(
            auth.authenticate_request(Some("Basic dXNlcjpwdw==")),
            Err(AppError::NoCredential(_))
        ));
        assert!(matches!(
            auth.authenticate_request(Some("Bearer ")),
            Err(AppError::NoCredential(_))
        ));
        assert!(matches!(
            auth.authenticate_request(Some("Bearer not-a-token")),
            Err(AppError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn refresh_issues_a_token_for_the_same_identity() {
        let (auth, _) = authenticator().await;
        let session = Session {
            principal_id: PrincipalId(3),
            username: "carol".into(),
        };

        let token = auth.refresh(&session).unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(auth.authenticate_request(Some(&header)).unwrap(), session);
    }
}

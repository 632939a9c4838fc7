//! HTTP client for the task API.
//!
//! Mirrors the browser client's protocol: the session token is kept in a
//! [`TokenStore`], and any authenticated call that comes back 401 triggers
//! exactly one token refresh and one retry. If that cycle also ends in a
//! 401, the stored token is dropped and the caller has to log in again.

use std::future::Future;

use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    credential,
    models::{
        Claims, Credentials, ErrorResponse, MessageResponse, NewTask, Task, TaskUpdate,
        TokenResponse,
    },
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("not logged in")]
    NotLoggedIn,
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Where the client keeps its session token between calls.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn save(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

pub struct TodoClient<S = MemoryTokenStore> {
    base_url: String,
    http: reqwest::Client,
    tokens: S,
}

impl TodoClient<MemoryTokenStore> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_store(base_url, MemoryTokenStore::default())
    }
}

impl<S: TokenStore> TodoClient<S> {
    pub fn with_store(base_url: impl Into<String>, tokens: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &S {
        &self.tokens
    }

    /// Claims of the stored token, decoded without verification. Only for
    /// showing who is logged in.
    pub fn current_user(&self) -> Option<Claims> {
        self.tokens
            .load()
            .and_then(|token| credential::inspect(&token).ok())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<String, ClientError> {
        check_credentials(username, password)?;

        let response: MessageResponse = self
            .send(self.request(Method::POST, "/register").json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }))
            .await?;

        Ok(response.message)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        check_credentials(username, password)?;

        let response: TokenResponse = self
            .send(self.request(Method::POST, "/login").json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }))
            .await?;

        self.tokens.save(&response.token);
        Ok(())
    }

    pub fn logout(&self) {
        self.tokens.clear();
    }

    /// Swaps the stored token for a fresh one. Clears it if the server
    /// refuses, since a token that cannot be refreshed is useless.
    pub async fn refresh_token(&self) -> Result<(), ClientError> {
        let token = self.tokens.load().ok_or(ClientError::NotLoggedIn)?;

        let result: Result<TokenResponse, ClientError> = self
            .send(self.request(Method::POST, "/refresh-token").bearer_auth(token))
            .await;

        match result {
            Ok(response) => {
                self.tokens.save(&response.token);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("token refresh failed: {}", e);
                self.tokens.clear();
                Err(e)
            }
        }
    }

    pub async fn list_todos(&self) -> Result<Vec<Task>, ClientError> {
        self.authorized(|token| self.send(self.request(Method::GET, "/todos").bearer_auth(token)))
            .await
    }

    pub async fn add_todo(&self, title: &str) -> Result<Task, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::Validation(
                "Task title cannot be empty".to_string(),
            ));
        }

        let body = NewTask {
            title: title.to_string(),
        };
        self.authorized(|token| {
            self.send(
                self.request(Method::POST, "/todos")
                    .bearer_auth(token)
                    .json(&body),
            )
        })
        .await
    }

    pub async fn update_todo(
        &self,
        id: i64,
        title: &str,
        completed: bool,
    ) -> Result<Task, ClientError> {
        let body = TaskUpdate {
            title: title.to_string(),
            completed: Some(completed),
        };
        let path = format!("/todos/{}", id);
        self.authorized(|token| {
            self.send(
                self.request(Method::PUT, &path)
                    .bearer_auth(token)
                    .json(&body),
            )
        })
        .await
    }

    pub async fn toggle_todo(&self, task: &Task) -> Result<Task, ClientError> {
        self.update_todo(task.id, &task.title, !task.completed).await
    }

    pub async fn delete_todo(&self, id: i64) -> Result<String, ClientError> {
        let path = format!("/todos/{}", id);
        let response: MessageResponse = self
            .authorized(|token| self.send(self.request(Method::DELETE, &path).bearer_auth(token)))
            .await?;

        Ok(response.message)
    }

    /// Runs `call` with the stored token; on 401 refreshes once and retries
    /// once. A second 401 clears the stored token.
    pub async fn authorized<T, F, Fut>(&self, call: F) -> Result<T, ClientError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let token = self.tokens.load().ok_or(ClientError::NotLoggedIn)?;

        match call(token).await {
            Err(e) if e.is_unauthorized() => {
                tracing::debug!("token rejected, refreshing once");
                self.refresh_token().await?;

                let token = self.tokens.load().ok_or(ClientError::NotLoggedIn)?;
                let retried = call(token).await;
                if matches!(&retried, Err(e) if e.is_unauthorized()) {
                    self.tokens.clear();
                }
                retried
            }
            other => other,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(ClientError::Status { status, message })
    }
}

fn check_credentials(username: &str, password: &str) -> Result<(), ClientError> {
    if username.is_empty() || password.is_empty() {
        return Err(ClientError::Validation(
            "Username and password must be filled in".to_string(),
        ));
    }
    Ok(())
}

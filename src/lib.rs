use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub mod authenticator;
pub mod client;
pub mod config;
pub mod credential;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod store;


use authenticator::Authenticator;
use config::Config;
use credential::CredentialCodec;
use error::AppError;
use store::{PrincipalStore, TaskStore};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::tasks::list_todos,
        handlers::tasks::create_todo,
        handlers::tasks::update_todo,
        handlers::tasks::delete_todo
    ),
    components(
        schemas(
            models::Credentials,
            models::MessageResponse,
            models::TokenResponse,
            models::ErrorResponse,
            models::Task,
            models::NewTask,
            models::TaskUpdate
        )
    ),
    modifiers(&BearerAuthAddon),
    tags(
        (name = "auth", description = "Registration, login and token renewal"),
        (name = "tasks", description = "Per-user task management")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme that protected routes reference.
struct BearerAuthAddon;

impl Modify for BearerAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("HS256 token from `/login`, valid for one hour"))
                    .build(),
            ),
        );
    }
}

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub tasks: TaskStore,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        jwt_secret: &str,
        hash_params: argon2::Params,
    ) -> Result<Self, AppError> {
        let authenticator = Authenticator::new(
            PrincipalStore::new(pool.clone()),
            CredentialCodec::new(jwt_secret.as_bytes()),
            hash_params,
        )?;

        Ok(Self {
            authenticator: Arc::new(authenticator),
            tasks: TaskStore::new(pool),
        })
    }

    pub fn from_config(pool: SqlitePool, config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(pool, &config.jwt_secret, config.hash_params()?)?)
    }
}

impl FromRef<AppState> for Arc<Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

impl FromRef<AppState> for TaskStore {
    fn from_ref(state: &AppState) -> Self {
        state.tasks.clone()
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "taskgate is running" }))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Public
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        // Bearer token required
        .route("/refresh-token", post(handlers::auth::refresh_token))
        .route(
            "/todos",
            get(handlers::tasks::list_todos).post(handlers::tasks::create_todo),
        )
        .route(
            "/todos/:id",
            put(handlers::tasks::update_todo).delete(handlers::tasks::delete_todo),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

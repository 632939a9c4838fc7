//! Server configuration, read from the environment (a `.env` file is loaded
//! first by the binary).
//!
//! ```bash
//! JWT_SECRET=...                  # required
//! DATABASE_URL=sqlite://todos.db
//! BIND_ADDR=0.0.0.0:3000
//! TASK_OWNERSHIP=true             # add the todos.user_id column at startup
//! ARGON2_MEMORY_KIB=19456
//! ARGON2_ITERATIONS=2
//! ```

use std::net::SocketAddr;

use argon2::Params;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub task_ownership: bool,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingSecret,

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Invalid argon2 parameters: {0}")]
    InvalidHashParams(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://todos.db".to_string());

        Ok(Self {
            jwt_secret,
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            task_ownership: parse_or(&lookup, "TASK_OWNERSHIP", true)?,
            argon2_memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", Params::DEFAULT_M_COST)?,
            argon2_iterations: parse_or(&lookup, "ARGON2_ITERATIONS", Params::DEFAULT_T_COST)?,
        })
    }

    pub fn hash_params(&self) -> Result<Params, ConfigError> {
        Params::new(
            self.argon2_memory_kib,
            self.argon2_iterations,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| ConfigError::InvalidHashParams(e.to_string()))
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

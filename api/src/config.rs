use std::{env, time::Duration};

use dotenv::dotenv;

/// How bearer tokens are verified.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityConfig {
    /// Firebase ID tokens for the given project.
    Firebase { project_id: String },
    /// HS256 tokens signed with a shared secret. Meant for local development.
    SharedSecret { secret: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Storage; without a URL the in-memory store is used
    pub database_url: Option<String>,

    // External services
    pub stripe_secret_key: String,
    pub identity: IdentityConfig,

    // Security
    pub allowed_origins: Vec<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or("PORT", var("PORT"), 3000u16)?;

        let database_url = var("DATABASE_URL");

        let stripe_secret_key = var("STRIPE_SECRET_KEY")
            .or_else(|| var("db_stripe_secret"))
            .ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        let identity = match (var("FIREBASE_PROJECT_ID"), var("JWT_SECRET")) {
            (Some(project_id), _) => IdentityConfig::Firebase { project_id },
            (None, Some(secret)) => IdentityConfig::SharedSecret { secret },
            (None, None) => return Err(ConfigError::Missing("FIREBASE_PROJECT_ID or JWT_SECRET")),
        };

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout = Duration::from_secs(parse_or(
            "REQUEST_TIMEOUT_SECS",
            var("REQUEST_TIMEOUT_SECS"),
            30u64,
        )?);

        Ok(Config {
            server_host,
            server_port,
            database_url,
            stripe_secret_key,
            identity,
            allowed_origins,
            request_timeout,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

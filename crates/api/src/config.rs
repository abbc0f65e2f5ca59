//! Application configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `RUST_LOG` | `info` |
//! | `LOG_FORMAT` | `pretty` (`json` for structured output) |
//! | `APP_ENV` | `development` |
//! | `DATABASE_URL` | unset, in-memory store |
//! | `TOKEN_SECRET` | development secret; required in production |
//! | `TOKEN_TTL_DAYS` | `30` (1 to 3650) |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset |

use std::fmt;

use secrecy::SecretString;
use thiserror::Error;

const DEV_TOKEN_SECRET: &str = "storefront-development-token-secret";
const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Configuration errors that abort start-up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Credentials for the administrator account ensured at start-up.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: SecretString,
}

impl fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub environment: Environment,
    pub database_url: Option<SecretString>,
    pub token_secret: SecretString,
    pub token_ttl_days: i64,
    pub admin: Option<AdminBootstrap>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("environment", &self.environment)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl_days", &self.token_ttl_days)
            .field("admin", &self.admin)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar("PORT", raw))?,
            None => 3000,
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar("LOG_FORMAT", other.to_string()));
            }
        };

        let environment = match var("APP_ENV").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => return Err(ConfigError::InvalidEnvVar("APP_ENV", other.to_string())),
        };

        let token_secret = match var("TOKEN_SECRET") {
            Some(secret) => SecretString::from(secret),
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("TOKEN_SECRET"));
            }
            None => SecretString::from(DEV_TOKEN_SECRET.to_string()),
        };

        let token_ttl_days = match var("TOKEN_TTL_DAYS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(days) if (1..=MAX_TOKEN_TTL_DAYS).contains(&days) => days,
                _ => return Err(ConfigError::InvalidEnvVar("TOKEN_TTL_DAYS", raw)),
            },
            None => DEFAULT_TOKEN_TTL_DAYS,
        };

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password: SecretString::from(password),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("ADMIN_EMAIL")),
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format,
            environment,
            database_url: var("DATABASE_URL").map(SecretString::from),
            token_secret,
            token_ttl_days,
            admin,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            environment: Environment::Development,
            database_url: None,
            token_secret: SecretString::from(DEV_TOKEN_SECRET.to_string()),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            admin: None,
        }
    }
}

//! Process configuration for the SkillSwap auth service.
//!
//! Everything is read once at start-up by [`AuthConfig::from_env`] and handed
//! to components explicitly. Nothing downstream looks at the environment.

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const DEFAULT_ACCESS_TTL_SECS: u64 = 3600;
const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_ISSUER: &str = "skillswap";
const DEFAULT_BCRYPT_COST: u32 = 10;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SLOW_REQUEST_MS: u64 = 1000;

/// Upper bound for either token lifetime (ten years).
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// bcrypt accepts cost factors in this range only.
pub const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must not be empty")]
    EmptySecret(&'static str),

    #[error("JWT_SECRET and JWT_REFRESH_SECRET must differ")]
    SharedSecret,

    #[error("BCRYPT_SALT_ROUNDS must be between 4 and 31, got {0}")]
    CostOutOfRange(u32),

    #[error("{0} must be greater than zero")]
    ZeroTtl(&'static str),

    #[error("{name} must not exceed {max} seconds, got {value}")]
    TtlTooLong { name: &'static str, value: u64, max: u64 },
}

#[derive(Debug)]
pub struct JwtConfig {
    pub access_secret: SecretString,
    pub access_ttl: Duration,
    pub refresh_secret: SecretString,
    pub refresh_ttl: Duration,
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(
        access_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_secret: impl Into<String>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: SecretString::from(access_secret.into()),
            access_ttl,
            refresh_secret: SecretString::from(refresh_secret.into()),
            refresh_ttl,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let access = self.access_secret.expose_secret();
        let refresh = self.refresh_secret.expose_secret();

        if access.is_empty() {
            return Err(ConfigError::EmptySecret("JWT_SECRET"));
        }
        if refresh.is_empty() {
            return Err(ConfigError::EmptySecret("JWT_REFRESH_SECRET"));
        }
        if access == refresh {
            return Err(ConfigError::SharedSecret);
        }
        if self.access_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl("JWT_EXPIRES_IN"));
        }
        if self.refresh_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl("JWT_REFRESH_EXPIRES_IN"));
        }
        for (name, ttl) in [("JWT_EXPIRES_IN", self.access_ttl), ("JWT_REFRESH_EXPIRES_IN", self.refresh_ttl)] {
            if ttl.as_secs() > MAX_TTL_SECS {
                return Err(ConfigError::TtlTooLong { name, value: ttl.as_secs(), max: MAX_TTL_SECS });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub json: bool,
    /// Fallback filter when `RUST_LOG` is unset.
    pub level: String,
    pub log_spans: bool,
    pub slow_request_ms: u64,
}

#[derive(Debug)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AuthConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt = JwtConfig {
            access_secret: SecretString::from(required(&lookup, "JWT_SECRET")?),
            access_ttl: Duration::from_secs(parse_or(&lookup, "JWT_EXPIRES_IN", DEFAULT_ACCESS_TTL_SECS)?),
            refresh_secret: SecretString::from(required(&lookup, "JWT_REFRESH_SECRET")?),
            refresh_ttl: Duration::from_secs(parse_or(&lookup, "JWT_REFRESH_EXPIRES_IN", DEFAULT_REFRESH_TTL_SECS)?),
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
        };
        jwt.validate()?;

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_SALT_ROUNDS", DEFAULT_BCRYPT_COST)?;
        if !BCRYPT_COST_RANGE.contains(&bcrypt_cost) {
            return Err(ConfigError::CostOutOfRange(bcrypt_cost));
        }

        let store = match lookup("AUTH_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid { name: "AUTH_STORE", value: other.to_string() })
            }
        };

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            store,
            database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        };

        let json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("pretty") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError::Invalid { name: "LOG_FORMAT", value: other.to_string() })
            }
        };
        let logging = LoggingConfig {
            json,
            level: lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_spans: parse_or(&lookup, "LOG_SPANS", false)?,
            slow_request_ms: parse_or(&lookup, "SLOW_REQUEST_MS", DEFAULT_SLOW_REQUEST_MS)?,
        };

        tracing::debug!(
            store = ?server.store,
            port = server.port,
            access_ttl_secs = jwt.access_ttl.as_secs(),
            refresh_ttl_secs = jwt.refresh_ttl.as_secs(),
            "configuration loaded"
        );

        Ok(Self { jwt, bcrypt_cost, server, logging })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

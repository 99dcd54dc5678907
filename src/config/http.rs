use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

use super::helpers::{optional_env, parse_optional_env, require_env};

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl HttpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match optional_env("HTTP_HOST")? {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HTTP_HOST".to_string(),
                message: format!("not a valid IP address: {raw}"),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = parse_optional_env("HTTP_PORT", 8000)?;
        Ok(Self { host, port })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Authentication settings: the JWT verification key for API requests
/// and the lifetime of chat session tokens.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub session_ttl: Duration,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = require_env(
            "JWT_SECRET",
            "set JWT_SECRET to the HS256 key used to sign bearer tokens",
        )?;
        let ttl_secs: u64 = parse_optional_env("SESSION_TTL_SECONDS", 3600)?;
        Ok(Self {
            jwt_secret: jwt_secret.into(),
            session_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

/// Per-user request throttling for the chat endpoint.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            requests_per_minute: parse_optional_env("RATE_LIMIT_REQUESTS_PER_MINUTE", 20)?,
            requests_per_hour: parse_optional_env("RATE_LIMIT_REQUESTS_PER_HOUR", 100)?,
        })
    }
}

//! Service configuration from the environment.

use std::net::SocketAddr;

use notebase_core::{defaults, Error, Result};
use notebase_db::FaunaConfig;

/// Everything the service reads at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub fauna: FaunaConfig,
    pub notes_collection: String,
    pub notes_index: String,
    pub max_body_bytes: usize,
}

impl ServiceConfig {
    /// Read the configuration from environment variables.
    ///
    /// - `HOST` - default [`defaults::SERVER_HOST`]
    /// - `PORT` - default [`defaults::SERVER_PORT`]
    /// - `FAUNA_SECRET`, `FAUNA_ENDPOINT`, `FAUNA_TIMEOUT_SECS` - see [`FaunaConfig::from_env`]
    /// - `NOTES_COLLECTION` - default [`defaults::NOTES_COLLECTION`]
    /// - `NOTES_INDEX` - default [`defaults::NOTES_INDEX`]
    /// - `MAX_BODY_BYTES` - default [`defaults::MAX_BODY_BYTES`]
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("HOST", defaults::SERVER_HOST),
            port: parse_env("PORT", defaults::SERVER_PORT)?,
            fauna: FaunaConfig::from_env()?,
            notes_collection: env_or("NOTES_COLLECTION", defaults::NOTES_COLLECTION),
            notes_index: env_or("NOTES_INDEX", defaults::NOTES_INDEX),
            max_body_bytes: parse_env("MAX_BODY_BYTES", defaults::MAX_BODY_BYTES)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not valid: {}", name, raw))),
        _ => Ok(default),
    }
}

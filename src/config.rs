//! Process configuration parsed from environment variables.

use std::net::IpAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// YAML room layout. The built-in classroom is used when unset.
    pub layout_path: Option<PathBuf>,
    pub static_dir: PathBuf,
    pub client_channel_capacity: usize,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `BIND_ADDR`: default `0.0.0.0`
    /// - `LAYOUT_PATH`: YAML layout file
    /// - `STATIC_DIR`: default `static`
    /// - `CLIENT_CHANNEL_CAPACITY`: per-client outbound buffer, default 256
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable can't be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env_parse("BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let port = env_parse("PORT", Some(DEFAULT_PORT))?;
        let client_channel_capacity = env_parse("CLIENT_CHANNEL_CAPACITY", Some(DEFAULT_CLIENT_CHANNEL_CAPACITY))?;
        if client_channel_capacity == 0 {
            return Err(ConfigError::Invalid { var: "CLIENT_CHANNEL_CAPACITY", value: "0".into() });
        }

        let layout_path = std::env::var("LAYOUT_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let static_dir = std::env::var("STATIC_DIR").map_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from);

        Ok(Self { bind_addr, port, layout_path, static_dir, client_channel_capacity })
    }
}

/// Parse an env var, falling back to `default` when unset. A value that is
/// set but unparsable is an error rather than a silent fallback.
fn env_parse<T>(var: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => default.ok_or(ConfigError::Invalid { var, value: String::new() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

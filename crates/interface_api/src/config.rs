//! API and leave policy configuration
//!
//! Both are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then environment variables. Server settings use the
//! `API_` prefix; policy settings use `LEAVE_` with `__` separating nested
//! keys (`LEAVE_CONFIRMATION_WINDOW__OPENS_ON_DAY=28`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use domain_leave::LeavePolicy;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Policy file, without extension
    pub policy_file: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/ward_leave".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            policy_file: "config/leave".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads the leave policy from `{file}.toml` (optional) and `LEAVE_*`
/// variables; anything unset keeps its default
pub fn load_policy(file: &str) -> Result<LeavePolicy, ConfigError> {
    Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(Environment::with_prefix("LEAVE").separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert!(!config.log_json);
    }

    #[test]
    fn test_missing_policy_file_yields_defaults() {
        let policy = load_policy("does/not/exist").unwrap();
        assert_eq!(policy, LeavePolicy::default());
    }
}

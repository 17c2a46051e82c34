//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;

use tracing::warn;

/// Secret used when `JWT_SECRET_KEY` is unset. Development only.
const DEV_JWT_SECRET: &str = "lectern-dev-secret-change-in-production";

/// `LECTERN_ENV` value under which the development secret is allowed.
const DEVELOPMENT_ENV: &str = "development";

/// Longest accepted access token lifetime (one year).
const MAX_ACCESS_LIFETIME_MINUTES: i64 = 60 * 24 * 365;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Upper bound on pooled connections
    pub database_max_connections: u32,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let jwt_access_lifetime_secs = access_lifetime_secs(
            &env::var("JWT_ACCESS_LIFETIME_MINUTES").unwrap_or_else(|_| "30".to_string()),
        )?;

        let env_mode = env::var("LECTERN_ENV").unwrap_or_else(|_| DEVELOPMENT_ENV.to_string());
        let jwt_secret = resolve_jwt_secret(&env_mode, env::var("JWT_SECRET_KEY").ok())?;

        let config = ApiConfig {
            host: env::var("LECTERN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("LECTERN_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LECTERN_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./lectern.db".to_string()),

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()))?,

            jwt_secret,
            jwt_access_lifetime_secs,
        };

        if config.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses `JWT_ACCESS_LIFETIME_MINUTES` into seconds.
///
/// Accepts 1..=`MAX_ACCESS_LIFETIME_MINUTES`.
fn access_lifetime_secs(raw: &str) -> Result<i64, ConfigError> {
    let invalid = || ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_MINUTES".to_string());

    let minutes: i64 = raw.trim().parse().map_err(|_| invalid())?;
    if minutes <= 0 || minutes > MAX_ACCESS_LIFETIME_MINUTES {
        return Err(invalid());
    }
    minutes.checked_mul(60).ok_or_else(invalid)
}

/// Picks the signing secret for the given `LECTERN_ENV`.
///
/// Outside development an unset or empty `JWT_SECRET_KEY` is an error.
fn resolve_jwt_secret(env_mode: &str, secret: Option<String>) -> Result<String, ConfigError> {
    match secret {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ if env_mode.eq_ignore_ascii_case(DEVELOPMENT_ENV) => {
            warn!("JWT_SECRET_KEY is not set, using the development secret");
            Ok(DEV_JWT_SECRET.to_string())
        }
        _ => Err(ConfigError::MissingRequired("JWT_SECRET_KEY".to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "./lectern.db".to_string(),
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 1800,
        };
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_config_error_names_variable() {
        let err = ConfigError::InvalidValue("LECTERN_PORT".to_string());
        assert_eq!(err.to_string(), "Invalid value for LECTERN_PORT");
    }

    #[test]
    fn test_access_lifetime_bounds() {
        assert_eq!(access_lifetime_secs("30").unwrap(), 1800);
        assert_eq!(
            access_lifetime_secs(&MAX_ACCESS_LIFETIME_MINUTES.to_string()).unwrap(),
            MAX_ACCESS_LIFETIME_MINUTES * 60
        );

        assert!(access_lifetime_secs("0").is_err());
        assert!(access_lifetime_secs("-5").is_err());
        assert!(access_lifetime_secs("thirty").is_err());
        assert!(access_lifetime_secs(&(MAX_ACCESS_LIFETIME_MINUTES + 1).to_string()).is_err());
    }

    #[test]
    fn test_oversized_lifetime_rejected_without_overflow() {
        let err = access_lifetime_secs(&i64::MAX.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name) if name == "JWT_ACCESS_LIFETIME_MINUTES"));
    }

    #[test]
    fn test_secret_required_outside_development() {
        let err = resolve_jwt_secret("production", None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref name) if name == "JWT_SECRET_KEY"));
        assert!(resolve_jwt_secret("production", Some(String::new())).is_err());

        assert_eq!(
            resolve_jwt_secret("production", Some("prod-secret".to_string())).unwrap(),
            "prod-secret"
        );
    }

    #[test]
    fn test_development_falls_back_to_dev_secret() {
        assert_eq!(resolve_jwt_secret("development", None).unwrap(), DEV_JWT_SECRET);
        assert_eq!(resolve_jwt_secret("Development", Some(String::new())).unwrap(), DEV_JWT_SECRET);
        assert_eq!(
            resolve_jwt_secret("development", Some("mine".to_string())).unwrap(),
            "mine"
        );
    }
}

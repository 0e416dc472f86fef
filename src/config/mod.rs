pub mod admin_user_conf;
pub mod alert_conf;
pub mod app_conf;
pub mod jwt_conf;
pub mod minio_conf;
pub mod mongo_conf;
pub mod upload_conf;

pub use admin_user_conf::AdminUserConfig;
pub use alert_conf::AlertConfig;
pub use app_conf::AppConfig;
pub use jwt_conf::JwtConfig;
pub use minio_conf::MinioConfig;
pub use mongo_conf::MongoConfig;
pub use upload_conf::UploadConfig;

use std::env;
use std::str::FromStr;
use tracing::{error, warn};

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Reads a required environment variable.
pub(crate) fn required_var(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| {
        error!("{} environment variable not found", key);
        ConfigError::EnvVarNotFound(key.to_string())
    })
}

/// Reads and parses an environment variable, falling back to `default` when it is unset.
pub(crate) fn parsed_var_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| {
            error!("Invalid {} value: {}", key, e);
            ConfigError::ParseError(format!("{}: {}", key, e))
        }),
        Err(_) => {
            warn!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

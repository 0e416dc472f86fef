use std::env;
use tracing::{error, info};

use crate::config::{parsed_var_or, required_var, ConfigError};

const DEFAULT_DATABASE: &str = "pharma_assure";

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    /// Credentials are only applied when both are set.
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
}

impl MongoConfig {
    /// `MONGO_URI` is required. `MONGO_DATABASE` defaults to `pharma_assure`,
    /// `MONGO_POOL_SIZE` to 10 and `MONGO_CONNECTION_TIMEOUT` to 5 seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = MongoConfig {
            uri: required_var("MONGO_URI")?,
            database: env::var("MONGO_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            username: env::var("MONGO_USERNAME").ok().filter(|v| !v.is_empty()),
            password: env::var("MONGO_PASSWORD").ok().filter(|v| !v.is_empty()),
            pool_size: parsed_var_or("MONGO_POOL_SIZE", 10u32)?,
            connection_timeout_secs: parsed_var_or("MONGO_CONNECTION_TIMEOUT", 5u64)?,
        };
        config.validate()?;
        info!(database = %config.database, pool_size = config.pool_size, "MongoDB configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://")) {
            error!("MONGO_URI is not a mongodb:// or mongodb+srv:// URI");
            return Err(ConfigError::InvalidValue("MONGO_URI must be a MongoDB connection string".to_string()));
        }
        if self.database.is_empty() || self.database.contains(['/', '.', ' ', '$']) {
            return Err(ConfigError::ValidationError(format!("Invalid database name: {:?}", self.database)));
        }
        if self.pool_size == 0 || self.connection_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "MongoDB pool size and connection timeout must be positive".to_string(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::ValidationError(
                "MONGO_USERNAME and MONGO_PASSWORD must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: DEFAULT_DATABASE.to_string(),
            username: None,
            password: None,
            pool_size: 10,
            connection_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MongoConfig::default();
        assert_eq!(config.database, "pharma_assure");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_uri_scheme_checked() {
        let config = MongoConfig { uri: "localhost:27017".to_string(), ..MongoConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
        let config = MongoConfig { uri: "mongodb+srv://cluster.example.org".to_string(), ..MongoConfig::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_name_checked() {
        for bad in ["", "pharma.assure", "a/b"] {
            let config = MongoConfig { database: bad.to_string(), ..MongoConfig::default() };
            assert!(config.validate().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let config = MongoConfig { pool_size: 0, ..MongoConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_come_in_pairs() {
        let config = MongoConfig { username: Some("svc".to_string()), ..MongoConfig::default() };
        assert!(config.validate().is_err());
        let config = MongoConfig {
            username: Some("svc".to_string()),
            password: Some("secret".to_string()),
            ..MongoConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}

use std::env;
use tracing::{error, info};

use crate::config::{parsed_var_or, required_var, ConfigError};

/// Where uploaded drug images and delivery documents are stored.
#[derive(Debug, Clone)]
pub struct MinioConfig {
    /// `host:port` without scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    /// Public base used to build download links, e.g. `https://cdn.example.org`.
    pub links_prefix: String,
    pub secure: bool,
}

fn valid_bucket_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && !name.starts_with(['-', '.'])
        && !name.ends_with(['-', '.'])
}

impl MinioConfig {
    /// Reads `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY`, `MINIO_SECRET_KEY` and
    /// `MINIO_BUCKET_NAME` (required), plus `MINIO_SECURE` and `MINIO_LINKS_PREFIX`.
    /// Links default to the endpoint itself.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = required_var("MINIO_ENDPOINT")?;
        let secure = parsed_var_or("MINIO_SECURE", false)?;
        let mut config = MinioConfig {
            access_key: required_var("MINIO_ACCESS_KEY")?,
            secret_key: required_var("MINIO_SECRET_KEY")?,
            bucket_name: required_var("MINIO_BUCKET_NAME")?,
            links_prefix: String::new(),
            secure,
            endpoint,
        };
        config.links_prefix = env::var("MINIO_LINKS_PREFIX").unwrap_or_else(|_| config.get_endpoint_url());
        config.validate()?;

        info!(endpoint = %config.endpoint, bucket = %config.bucket_name, "MinIO configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() || self.endpoint.contains("://") {
            error!(endpoint = %self.endpoint, "MinIO endpoint must be host:port");
            return Err(ConfigError::ValidationError("MINIO_ENDPOINT must be host:port".to_string()));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(ConfigError::ValidationError("MinIO credentials cannot be empty".to_string()));
        }
        if !valid_bucket_name(&self.bucket_name) {
            error!(bucket = %self.bucket_name, "Invalid bucket name");
            return Err(ConfigError::ValidationError(format!("Invalid bucket name: {}", self.bucket_name)));
        }
        Ok(())
    }

    pub fn get_endpoint_url(&self) -> String {
        format!("{}://{}", if self.secure { "https" } else { "http" }, self.endpoint)
    }
}

impl Default for MinioConfig {
    fn default() -> Self {
        MinioConfig {
            endpoint: "localhost:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket_name: "pharma-assure".to_string(),
            links_prefix: "http://localhost:9000".to_string(),
            secure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MinioConfig::default().validate().is_ok());
    }

    #[test]
    fn test_endpoint_must_be_host_and_port() {
        let mut config = MinioConfig::default();
        config.endpoint = String::new();
        assert!(config.validate().is_err());
        config.endpoint = "http://localhost:9000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bucket_name_rules() {
        for bad in ["ab", "Drug_Images", "-drugs", "drugs."] {
            let config = MinioConfig { bucket_name: bad.to_string(), ..MinioConfig::default() };
            assert!(config.validate().is_err(), "{}", bad);
        }
        let config = MinioConfig { bucket_name: "drug.images-2".to_string(), ..MinioConfig::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_url_follows_secure_flag() {
        let mut config = MinioConfig::default();
        assert_eq!(config.get_endpoint_url(), "http://localhost:9000");
        config.secure = true;
        assert_eq!(config.get_endpoint_url(), "https://localhost:9000");
    }
}

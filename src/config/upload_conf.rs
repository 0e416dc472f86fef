use serde::{Deserialize, Serialize};

use crate::config::{parsed_var_or, ConfigError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes.
    pub max_bytes: usize,
    /// Most files accepted by `/upload/multiple`.
    pub max_files: usize,
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = UploadConfig::default();
        let config = UploadConfig {
            max_bytes: parsed_var_or("UPLOAD_MAX_BYTES", defaults.max_bytes)?,
            max_files: parsed_var_or("UPLOAD_MAX_FILES", defaults.max_files)?,
        };
        if config.max_bytes == 0 || config.max_files == 0 {
            return Err(ConfigError::ValidationError("Upload limits must be greater than 0".to_string()));
        }
        Ok(config)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            max_bytes: 10 * 1024 * 1024,
            max_files: 5,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::env;

use crate::config::{required_var, ConfigError};

/// Credentials of the admin account created on first start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

impl AdminUserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AdminUserConfig {
            name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
            email: required_var("ADMIN_EMAIL")?,
            password: required_var("ADMIN_PASSWORD")?,
            phone: env::var("ADMIN_PHONE").ok(),
        })
    }
}

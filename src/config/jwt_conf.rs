use std::env;
use tracing::{debug, error, info, warn};

use crate::config::{parsed_var_or, required_var, ConfigError};

const MIN_SECRET_LEN: usize = 32;
const DEFAULT_ISSUER: &str = "pharma-assure";

/// Signing settings for access and refresh tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// JWT secret key for signing tokens
    pub jwt_secret: String,
    /// Access token expiration time in minutes
    pub access_token_expiration: i64,
    /// Refresh token expiration time in minutes
    pub refresh_token_expiration: i64,
    /// Issuer claim written into every token
    pub jwt_issuer: Option<String>,
}

impl JwtConfig {
    /// `JWT_SECRET` is required. Lifetimes come from `JWT_ACCESS_TOKEN_EXPIRY`
    /// (60 minutes) and `JWT_REFRESH_TOKEN_EXPIRY` (one week). `JWT_ISSUER`
    /// defaults to `pharma-assure`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required_var("JWT_SECRET")?;
        debug!(length = jwt_secret.len(), "JWT secret loaded");

        let config = JwtConfig {
            jwt_secret,
            access_token_expiration: parsed_var_or("JWT_ACCESS_TOKEN_EXPIRY", 60i64)?,
            refresh_token_expiration: parsed_var_or("JWT_REFRESH_TOKEN_EXPIRY", 7 * 24 * 60i64)?,
            jwt_issuer: Some(env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string())),
        };
        config.validate()?;

        info!(issuer = ?config.jwt_issuer, access_minutes = config.access_token_expiration, "JWT configuration loaded");
        Ok(config)
    }

    /// Secrets shorter than 32 bytes are refused. Both lifetimes must be positive
    /// and a refresh token has to outlive the access token it renews.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            error!(length = self.jwt_secret.len(), "JWT_SECRET is too short");
            return Err(ConfigError::ValidationError(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_SECRET_LEN
            )));
        }
        if self.access_token_expiration <= 0 || self.refresh_token_expiration <= 0 {
            return Err(ConfigError::ValidationError("Token lifetimes must be positive minutes".to_string()));
        }
        if self.refresh_token_expiration <= self.access_token_expiration {
            warn!(
                access = self.access_token_expiration,
                refresh = self.refresh_token_expiration,
                "Refresh tokens expire before access tokens"
            );
            return Err(ConfigError::InvalidValue(
                "JWT_REFRESH_TOKEN_EXPIRY must exceed JWT_ACCESS_TOKEN_EXPIRY".to_string(),
            ));
        }
        if self.jwt_issuer.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue("JWT_ISSUER cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            jwt_secret: "test_secret_key_for_jwt_testing_should_be_long_enough_for_security_purposes".to_string(),
            access_token_expiration: 60,
            refresh_token_expiration: 10080,
            jwt_issuer: Some(DEFAULT_ISSUER.to_string()),
        }
    }
}

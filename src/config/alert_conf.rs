use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

use crate::config::{parsed_var_or, ConfigError};
use crate::dto::alert_dto::MAX_EXPIRY_WINDOW_DAYS;

/// Schedules and thresholds of the background alert scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Whether the cron jobs are started at all.
    pub jobs_enabled: bool,
    /// Six-field cron expression (with seconds) for the stock scan.
    pub stock_scan_cron: String,
    /// Six-field cron expression (with seconds) for the expiry scan.
    pub expiry_scan_cron: String,
    /// Drugs expiring within this many days raise a warning.
    pub expiry_warning_days: i64,
    /// Drugs expiring within this many days raise a critical alert.
    pub critical_expiry_days: i64,
}

impl AlertConfig {
    /// Expected environment variables (all optional):
    /// - ALERT_JOBS_ENABLED (default true)
    /// - ALERT_STOCK_CRON (default hourly)
    /// - ALERT_EXPIRY_CRON (default daily at 08:00)
    /// - ALERT_EXPIRY_WARNING_DAYS (default 90)
    /// - ALERT_CRITICAL_EXPIRY_DAYS (default 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AlertConfig::default();
        let config = AlertConfig {
            jobs_enabled: parsed_var_or("ALERT_JOBS_ENABLED", defaults.jobs_enabled)?,
            stock_scan_cron: env::var("ALERT_STOCK_CRON").unwrap_or(defaults.stock_scan_cron),
            expiry_scan_cron: env::var("ALERT_EXPIRY_CRON").unwrap_or(defaults.expiry_scan_cron),
            expiry_warning_days: parsed_var_or("ALERT_EXPIRY_WARNING_DAYS", defaults.expiry_warning_days)?,
            critical_expiry_days: parsed_var_or("ALERT_CRITICAL_EXPIRY_DAYS", defaults.critical_expiry_days)?,
        };
        config.validate()?;
        info!(
            stock_cron = %config.stock_scan_cron,
            expiry_cron = %config.expiry_scan_cron,
            "Alert configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.critical_expiry_days < 0 || self.expiry_warning_days < 0 {
            return Err(ConfigError::ValidationError("Expiry windows cannot be negative".to_string()));
        }
        if self.expiry_warning_days > MAX_EXPIRY_WINDOW_DAYS {
            return Err(ConfigError::ValidationError(format!(
                "Expiry warning window cannot exceed {} days",
                MAX_EXPIRY_WINDOW_DAYS
            )));
        }
        if self.critical_expiry_days > self.expiry_warning_days {
            return Err(ConfigError::ValidationError(
                "Critical expiry window must not exceed the warning window".to_string(),
            ));
        }
        for expr in [&self.stock_scan_cron, &self.expiry_scan_cron] {
            if expr.split_whitespace().count() != 6 {
                return Err(ConfigError::InvalidValue(format!(
                    "Cron expression '{}' must have 6 fields (sec min hour day month weekday)",
                    expr
                )));
            }
        }
        Ok(())
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            jobs_enabled: true,
            stock_scan_cron: "0 0 * * * *".to_string(),
            expiry_scan_cron: "0 0 8 * * *".to_string(),
            expiry_warning_days: 90,
            critical_expiry_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AlertConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.expiry_warning_days, 90);
        assert_eq!(config.critical_expiry_days, 30);
    }

    #[test]
    fn test_critical_window_larger_than_warning_rejected() {
        let mut config = AlertConfig::default();
        config.critical_expiry_days = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warning_window_is_bounded() {
        let mut config = AlertConfig::default();
        config.expiry_warning_days = MAX_EXPIRY_WINDOW_DAYS;
        assert!(config.validate().is_ok());
        config.expiry_warning_days = MAX_EXPIRY_WINDOW_DAYS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_five_field_cron_rejected() {
        let mut config = AlertConfig::default();
        config.stock_scan_cron = "0 * * * *".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}

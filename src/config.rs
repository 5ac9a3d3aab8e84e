//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use crate::payments::PagsmileConfig;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pagsmile: PagsmileConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public URL of this service, used to build the webhook notify URL.
    pub base_url: String,
}

/// Checkout status polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Absolute deadline measured from the first poll.
    pub timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        let server = ServerConfig::from_env()?;
        let pagsmile = PagsmileConfig::from_env(&server.base_url)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        Ok(AppConfig {
            server,
            pagsmile,
            polling: PollingConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        validate_pagsmile(&self.pagsmile)?;
        self.polling.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("PORT cannot be 0".to_string()));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("HOST cannot be empty".to_string()));
        }

        if !is_http_url(&self.base_url) {
            return Err(ConfigError::InvalidValue(
                "BASE_URL must be a valid URL".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(PollingConfig {
            interval: match env::var("CHECKOUT_POLL_INTERVAL_MS") {
                Ok(v) => Duration::from_millis(v.parse().map_err(|_| {
                    ConfigError::InvalidValue("CHECKOUT_POLL_INTERVAL_MS".to_string())
                })?),
                Err(_) => defaults.interval,
            },
            timeout: match env::var("CHECKOUT_POLL_TIMEOUT_SECS") {
                Ok(v) => Duration::from_secs(v.parse().map_err(|_| {
                    ConfigError::InvalidValue("CHECKOUT_POLL_TIMEOUT_SECS".to_string())
                })?),
                Err(_) => defaults.timeout,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "CHECKOUT_POLL_INTERVAL_MS cannot be 0".to_string(),
            ));
        }
        if self.timeout < self.interval {
            return Err(ConfigError::ValidationFailed(
                "CHECKOUT_POLL_TIMEOUT_SECS must be >= the poll interval".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

fn validate_pagsmile(config: &PagsmileConfig) -> Result<(), ConfigError> {
    if config.app_id.trim().is_empty() {
        return Err(ConfigError::MissingVariable("PAGSMILE_APP_ID".to_string()));
    }
    if config.security_key.trim().is_empty() {
        return Err(ConfigError::MissingVariable(
            "PAGSMILE_SECURITY_KEY".to_string(),
        ));
    }
    if config.public_key.trim().is_empty() {
        return Err(ConfigError::MissingVariable("PAGSMILE_PUBLIC_KEY".to_string()));
    }
    if let Some(base_url) = &config.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::InvalidValue(
                "PAGSMILE_BASE_URL must be a valid URL".to_string(),
            ));
        }
    }
    if config.timeout_secs == 0 {
        return Err(ConfigError::InvalidValue("PAGSMILE_TIMEOUT_SECS".to_string()));
    }
    Ok(())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

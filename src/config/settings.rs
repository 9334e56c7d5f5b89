//! Settings for svcctl itself.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ServiceError;

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/svcctl/svcctl.toml";

/// Main settings structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// External programs and per-operation timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSettings {
    /// Service manager executable.
    #[serde(default = "default_service_manager")]
    pub service_manager: String,
    /// Package manager executable.
    #[serde(default = "default_package_manager")]
    pub package_manager: String,
    /// Timeout for `is-active` / `is-enabled` probes.
    #[serde(default = "default_status_timeout")]
    pub status_timeout_seconds: u64,
    /// Timeout for `start` / `stop`.
    #[serde(default = "default_control_timeout")]
    pub control_timeout_seconds: u64,
    /// Timeout for package installation.
    #[serde(default = "default_install_timeout")]
    pub install_timeout_seconds: u64,
    /// Timeout for package removal.
    #[serde(default = "default_remove_timeout")]
    pub remove_timeout_seconds: u64,
    /// Timeout for package info queries.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_seconds: u64,
}

/// Paths configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// JSON file holding the service descriptors.
    #[serde(default = "default_services_file")]
    pub services_file: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_service_manager() -> String {
    "systemctl".to_string()
}

fn default_package_manager() -> String {
    "apt".to_string()
}

fn default_status_timeout() -> u64 {
    30
}

fn default_control_timeout() -> u64 {
    120
}

fn default_install_timeout() -> u64 {
    600
}

fn default_remove_timeout() -> u64 {
    300
}

fn default_query_timeout() -> u64 {
    30
}

fn default_services_file() -> PathBuf {
    PathBuf::from("/etc/svcctl/services.json")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            service_manager: default_service_manager(),
            package_manager: default_package_manager(),
            status_timeout_seconds: default_status_timeout(),
            control_timeout_seconds: default_control_timeout(),
            install_timeout_seconds: default_install_timeout(),
            remove_timeout_seconds: default_remove_timeout(),
            query_timeout_seconds: default_query_timeout(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            services_file: default_services_file(),
        }
    }
}

impl CommandSettings {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_seconds)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_seconds)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_seconds)
    }

    pub fn remove_timeout(&self) -> Duration {
        Duration::from_secs(self.remove_timeout_seconds)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ServiceError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ServiceError::Config { message } => ServiceError::Config {
                message: format!("{} ('{}')", message, path.display()),
            },
            other => other,
        })
    }

    /// Load settings if the file exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ServiceError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ServiceError::Config {
            message: format!("Failed to parse settings: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ServiceError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ServiceError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        let c = &self.commands;
        for (key, value) in [
            ("status_timeout_seconds", c.status_timeout_seconds),
            ("control_timeout_seconds", c.control_timeout_seconds),
            ("install_timeout_seconds", c.install_timeout_seconds),
            ("remove_timeout_seconds", c.remove_timeout_seconds),
            ("query_timeout_seconds", c.query_timeout_seconds),
        ] {
            if value == 0 {
                return Err(ServiceError::Config {
                    message: format!("'{}' must be greater than zero", key),
                });
            }
        }

        if c.service_manager.trim().is_empty() || c.package_manager.trim().is_empty() {
            return Err(ServiceError::Config {
                message: "Service and package manager programs must be set".to_string(),
            });
        }

        Ok(())
    }
}

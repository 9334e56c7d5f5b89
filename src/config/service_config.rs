//! Per-service JSON configuration: brokers, database cluster, log level.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ServiceError;

/// Log level applied when the file leaves it empty.
pub const DEFAULT_SERVICE_LOG_LEVEL: &str = "INFO";

/// Configuration of one managed service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub local_broker: Broker,
    pub network_broker: Broker,
    pub db: DbConnector,
    pub log_level: String,
}

/// Messaging endpoint. Every field is passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Broker {
    pub ip: String,
    pub port: String,
    pub login: String,
    pub password: String,
    pub ca_path: String,
    pub key_path: String,
}

/// Database client endpoint plus the nodes of its cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbConnector {
    pub client_ip: String,
    pub client_port: String,
    pub db_cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub connectors: Vec<Connector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connector {
    pub ip: String,
    pub port: String,
}

impl ServiceConfig {
    /// Fill in values the file is allowed to omit.
    pub fn apply_defaults(&mut self) {
        if self.log_level.is_empty() {
            self.log_level = DEFAULT_SERVICE_LOG_LEVEL.to_string();
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, ServiceError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Read a service configuration file.
///
/// A missing or unreadable file is an error. A body that is not valid
/// JSON for a [`ServiceConfig`] is tolerated: it is logged and replaced
/// by the default configuration.
pub fn read_service_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig, ServiceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let mut config = serde_json::from_str::<ServiceConfig>(&content).unwrap_or_else(|e| {
        warn!(
            path = %path.display(),
            error = %e,
            "Ignoring malformed service config, using defaults"
        );
        ServiceConfig::default()
    });
    config.apply_defaults();

    debug!(path = %path.display(), log_level = %config.log_level, "Service config loaded");

    Ok(config)
}

/// Write a service configuration file, replacing any existing content.
///
/// New files are created with mode `0644` on unix.
pub fn write_service_config<P: AsRef<Path>>(
    path: P,
    config: &ServiceConfig,
) -> Result<(), ServiceError> {
    let path = path.as_ref();
    let body = serde_json::to_vec_pretty(config)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }

    let mut file = options.open(path)?;
    file.write_all(&body)?;
    file.flush()?;

    debug!(path = %path.display(), bytes = body.len(), "Service config written");

    Ok(())
}

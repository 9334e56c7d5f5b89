//! Service descriptor types.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;

/// A managed operating-system service.
///
/// Identity is [`Service::name`], which is also the unit passed to the
/// service manager. `package_name` is what the package manager installs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub name: String,
    /// Systemd units belonging to the service.
    pub units: Vec<String>,
    pub version: String,
    pub package_name: String,
    pub config: ServiceConfig,
    /// Where `config` is persisted.
    pub config_file: PathBuf,
}

/// Services keyed by an arbitrary caller-chosen key.
///
/// Iteration order is unspecified; batch operations do not depend on it.
pub type ServiceMap = HashMap<String, Service>;

/// A service together with its last probed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: Service,
    /// `None` when the state could not be determined.
    pub status: Option<String>,
}

impl ServiceStatus {
    pub fn new(service: Service, status: Option<String>) -> Self {
        Self { service, status }
    }

    pub fn unknown(service: Service) -> Self {
        Self::new(service, None)
    }

    pub fn is_known(&self) -> bool {
        self.status.is_some()
    }
}

//! Best-effort operations over many services.
//!
//! Every entry is attempted regardless of earlier failures. Failures are
//! logged and dropped; nothing is aggregated or returned.

use tracing::{debug, info, warn};

use crate::executor::CommandRunner;
use crate::services::{ServiceMap, ServiceState};

use super::service::ServiceController;

impl<R: CommandRunner> ServiceController<R> {
    /// Install the package of every service.
    pub fn install_packages(&self, services: &ServiceMap) {
        info!(count = services.len(), "Installing service packages");

        for (key, service) in services {
            if let Err(e) = self.install(service) {
                warn!(key = %key, service = %service.name, error = %e, "Install failed, continuing");
            }
        }
    }

    /// Start every service that is not already running.
    ///
    /// A service whose state cannot be probed is started anyway.
    pub fn start_services(&self, services: &ServiceMap) {
        info!(count = services.len(), "Starting services");

        for (key, service) in services {
            match self.probe_state(service) {
                Ok(ServiceState::Running) => {
                    debug!(key = %key, service = %service.name, "Service already running");
                    continue;
                }
                Ok(state) => {
                    debug!(key = %key, service = %service.name, state = %state, "Service not running");
                }
                Err(e) => {
                    debug!(key = %key, service = %service.name, error = %e, "State unknown, starting anyway");
                }
            }

            if let Err(e) = self.start(service) {
                warn!(key = %key, service = %service.name, error = %e, "Start failed, continuing");
            }
        }
    }

    /// Stop every service, then remove its package.
    pub fn remove_services(&self, services: &ServiceMap) {
        info!(count = services.len(), "Removing services");

        for (key, service) in services {
            if let Err(e) = self.stop(service) {
                warn!(key = %key, service = %service.name, error = %e, "Stop failed, removing anyway");
            }
            if let Err(e) = self.remove(service) {
                warn!(key = %key, service = %service.name, error = %e, "Remove failed, continuing");
            }
        }
    }
}

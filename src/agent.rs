//! Service lifecycle interface and the agent that drives batch actions.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::controller::ServiceController;
use crate::error::{CommandErrorKind, ServiceError};
use crate::executor::{CancelToken, CommandRunner};
use crate::services::{load_services, ServiceMap, ServiceStatus};

/// Something that is configured from a file, then run until done or stopped.
pub trait ManagedService: Send + Sync {
    /// Prepare the service from its configuration file.
    fn initialize(&mut self, conf_file: &Path) -> Result<(), ServiceError>;

    /// Do the work. Blocks until finished or stopped.
    fn run(&self) -> Result<(), ServiceError>;

    /// Ask a running (or future) `run` to give up as soon as possible.
    fn stop(&self);
}

/// Batch action performed by [`ServiceAgent::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Status,
    Install,
    Start,
    Remove,
}

impl FromStr for Action {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Self::Status),
            "install" => Ok(Self::Install),
            "start" => Ok(Self::Start),
            "remove" => Ok(Self::Remove),
            other => Err(ServiceError::Config {
                message: format!("Unknown action '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Status => "status",
            Self::Install => "install",
            Self::Start => "start",
            Self::Remove => "remove",
        })
    }
}

/// Applies one [`Action`] to every service listed in a services file.
pub struct ServiceAgent<R: CommandRunner> {
    controller: ServiceController<R>,
    action: Action,
    cancel: CancelToken,
    services: Option<ServiceMap>,
    statuses: Mutex<Vec<ServiceStatus>>,
}

impl<R: CommandRunner> ServiceAgent<R> {
    /// `cancel` must be the token the controller's runner observes for
    /// `stop` to interrupt running commands.
    pub fn new(controller: ServiceController<R>, action: Action, cancel: CancelToken) -> Self {
        Self {
            controller,
            action,
            cancel,
            services: None,
            statuses: Mutex::new(Vec::new()),
        }
    }

    /// Use an already loaded set of services instead of a file.
    pub fn with_services(mut self, services: ServiceMap) -> Self {
        self.services = Some(services);
        self
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn controller(&self) -> &ServiceController<R> {
        &self.controller
    }

    /// Results of the last `status` run, sorted by service name.
    pub fn statuses(&self) -> Vec<ServiceStatus> {
        self.statuses
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn collect_statuses(&self, services: &ServiceMap) {
        let mut statuses: Vec<ServiceStatus> = services
            .values()
            .map(|service| self.controller.status(service))
            .collect();
        statuses.sort_by(|a, b| a.service.name.cmp(&b.service.name));

        let unknown = statuses.iter().filter(|status| !status.is_known()).count();
        if unknown > 0 {
            warn!(unknown, total = statuses.len(), "Some service states could not be probed");
        }

        match self.statuses.lock() {
            Ok(mut guard) => *guard = statuses,
            Err(e) => warn!(error = %e, "Status lock poisoned, discarding results"),
        }
    }
}

impl<R: CommandRunner> ManagedService for ServiceAgent<R> {
    fn initialize(&mut self, conf_file: &Path) -> Result<(), ServiceError> {
        let services = load_services(conf_file)?;
        info!(
            path = %conf_file.display(),
            count = services.len(),
            action = %self.action,
            "Agent initialized"
        );
        self.services = Some(services);
        Ok(())
    }

    fn run(&self) -> Result<(), ServiceError> {
        let services = self.services.as_ref().ok_or_else(|| ServiceError::Config {
            message: "Agent run before initialize".to_string(),
        })?;

        if self.cancel.is_cancelled() {
            return Err(ServiceError::Command {
                kind: CommandErrorKind::Cancelled,
            });
        }

        info!(action = %self.action, count = services.len(), "Running action");

        match self.action {
            Action::Status => self.collect_statuses(services),
            Action::Install => self.controller.install_packages(services),
            Action::Start => self.controller.start_services(services),
            Action::Remove => self.controller.remove_services(services),
        }

        if self.cancel.is_cancelled() {
            warn!(action = %self.action, "Action interrupted");
            return Err(ServiceError::Command {
                kind: CommandErrorKind::Cancelled,
            });
        }

        info!(action = %self.action, "Action complete");
        Ok(())
    }

    fn stop(&self) {
        info!(action = %self.action, "Stop requested");
        self.cancel.cancel();
    }
}

//! Per-service operations.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::CommandSettings;
use crate::error::{CommandErrorKind, ServiceError};
use crate::executor::{
    combined_output, sanitize_output, CommandRunner, SubprocessBuilder, SystemRunner,
};
use crate::services::{Service, ServiceState, ServiceStatus};
use crate::validation::{validate_package_name, validate_service_name};

/// Runs service-manager and package-manager commands for services.
pub struct ServiceController<R: CommandRunner = SystemRunner> {
    runner: R,
    commands: CommandSettings,
}

impl<R: CommandRunner> ServiceController<R> {
    pub fn new(runner: R, commands: CommandSettings) -> Self {
        Self { runner, commands }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn commands(&self) -> &CommandSettings {
        &self.commands
    }

    pub(super) fn service_command(&self, verb: &str, unit: &str, timeout: Duration) -> SubprocessBuilder {
        SubprocessBuilder::new(&self.commands.service_manager)
            .args([verb, unit])
            .timeout(timeout)
    }

    pub(super) fn package_command(&self, verb: &str, package: &str, timeout: Duration) -> SubprocessBuilder {
        SubprocessBuilder::new(&self.commands.package_manager)
            .args([verb, "-y", package])
            .env("DEBIAN_FRONTEND", "noninteractive")
            .timeout(timeout)
    }

    /// Run a command that must exit zero; returns stdout+stderr.
    pub(super) fn run_checked(&self, command: SubprocessBuilder) -> Result<String, ServiceError> {
        let program = command.program().to_string();
        let line = command.display_line();
        let id = command.id();

        let result = self.runner.run(command)?;
        let output = combined_output(&result);

        if !result.success {
            warn!(
                invocation_id = %id,
                command = %line,
                exit_code = ?result.exit_code,
                output = %sanitize_output(&output, 5),
                "Command failed"
            );
            return Err(ServiceError::Command {
                kind: CommandErrorKind::NonZeroExit {
                    program,
                    exit_code: result.exit_code,
                    output,
                },
            });
        }

        Ok(output)
    }

    /// Trimmed stdout of a state probe. The exit code is ignored: the
    /// service manager reports inactive units with a non-zero exit.
    fn probe(&self, verb: &str, unit: &str) -> Result<String, ServiceError> {
        let command = self.service_command(verb, unit, self.commands.status_timeout());
        let result = self.runner.run(command)?;
        Ok(result.stdout.trim().to_string())
    }

    /// Probe the state of a service, reporting probes that could not run.
    pub fn probe_state(&self, service: &Service) -> Result<ServiceState, ServiceError> {
        validate_service_name(&service.name)?;

        let active = self.probe("is-active", &service.name)?;
        if let Some(state) = ServiceState::from_is_active(&active) {
            return Ok(state);
        }

        let enabled = self.probe("is-enabled", &service.name)?;
        Ok(ServiceState::from_is_enabled(&enabled))
    }

    /// Probe the state of a service, treating a probe that could not run
    /// as empty output.
    ///
    /// Never fails; a service whose probes cannot run reads as
    /// [`ServiceState::Missing`].
    pub fn state(&self, service: &Service) -> ServiceState {
        if let Err(e) = validate_service_name(&service.name) {
            debug!(service = %service.name, error = %e, "Cannot probe service");
            return ServiceState::Missing;
        }

        let swallow = |verb: &str| {
            self.probe(verb, &service.name).unwrap_or_else(|e| {
                debug!(service = %service.name, probe = verb, error = %e, "Probe failed");
                String::new()
            })
        };

        let active = swallow("is-active");
        ServiceState::from_probes(&active, || swallow("is-enabled"))
    }

    /// Snapshot of a service and its state; the state is `None` when the
    /// probe could not run.
    pub fn status(&self, service: &Service) -> ServiceStatus {
        match self.probe_state(service) {
            Ok(state) => ServiceStatus::new(service.clone(), Some(state.to_string())),
            Err(e) => {
                warn!(service = %service.name, error = %e, "Unable to determine service state");
                ServiceStatus::unknown(service.clone())
            }
        }
    }

    /// Install the package providing a service.
    pub fn install(&self, service: &Service) -> Result<String, ServiceError> {
        validate_package_name(&service.package_name)?;

        debug!(service = %service.name, package = %service.package_name, "Installing package");

        let output = self.run_checked(self.package_command(
            "install",
            &service.package_name,
            self.commands.install_timeout(),
        ))?;

        info!(service = %service.name, package = %service.package_name, "Package installed successfully");

        Ok(output)
    }

    /// Remove the package providing a service.
    pub fn remove(&self, service: &Service) -> Result<String, ServiceError> {
        validate_package_name(&service.package_name)?;

        debug!(service = %service.name, package = %service.package_name, "Removing package");

        let output = self.run_checked(self.package_command(
            "remove",
            &service.package_name,
            self.commands.remove_timeout(),
        ))?;

        info!(service = %service.name, package = %service.package_name, "Package removed successfully");

        Ok(output)
    }

    /// Start a service.
    pub fn start(&self, service: &Service) -> Result<String, ServiceError> {
        validate_service_name(&service.name)?;

        debug!(service = %service.name, "Starting service");

        let output = self.run_checked(self.service_command(
            "start",
            &service.name,
            self.commands.control_timeout(),
        ))?;

        info!(service = %service.name, "Service started successfully");

        Ok(output)
    }

    /// Stop a service.
    pub fn stop(&self, service: &Service) -> Result<String, ServiceError> {
        validate_service_name(&service.name)?;

        debug!(service = %service.name, "Stopping service");

        let output = self.run_checked(self.service_command(
            "stop",
            &service.name,
            self.commands.control_timeout(),
        ))?;

        info!(service = %service.name, "Service stopped successfully");

        Ok(output)
    }
}

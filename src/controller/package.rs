//! Installed package version queries.

use tracing::debug;

use crate::error::{CommandErrorKind, ServiceError};
use crate::executor::{CommandRunner, SubprocessBuilder};
use crate::validation::validate_package_name;

use super::service::ServiceController;

/// Extract the version from package info output.
///
/// Looks for the first line starting with `Version:` and returns the
/// token after it.
pub fn parse_package_version(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.starts_with("Version:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

impl<R: CommandRunner> ServiceController<R> {
    /// Query the version of a package, reporting query failures.
    ///
    /// `Ok(None)` means the query ran but printed no usable `Version:` line.
    pub fn probe_package_version(&self, package: &str) -> Result<Option<String>, ServiceError> {
        validate_package_name(package)?;

        let command = SubprocessBuilder::new(&self.commands().package_manager)
            .args(["show", package])
            .timeout(self.commands().query_timeout());
        let result = self.run_checked_stdout(command)?;

        Ok(parse_package_version(&result))
    }

    /// Query the version of a package; any failure reads as `None`.
    pub fn package_version(&self, package: &str) -> Option<String> {
        self.probe_package_version(package).unwrap_or_else(|e| {
            debug!(package = %package, error = %e, "Package version query failed");
            None
        })
    }

    // apt prints a CLI-stability warning on stderr; only stdout is parsed.
    fn run_checked_stdout(&self, command: SubprocessBuilder) -> Result<String, ServiceError> {
        let program = command.program().to_string();
        let result = self.runner().run(command)?;
        if result.success {
            Ok(result.stdout)
        } else {
            Err(ServiceError::Command {
                kind: CommandErrorKind::NonZeroExit {
                    program,
                    exit_code: result.exit_code,
                    output: result.stderr,
                },
            })
        }
    }
}

//! The seam between service operations and the operating system.

use crate::error::ServiceError;

use super::cancel::CancelToken;
use super::subprocess::{SubprocessBuilder, SubprocessResult};

/// Executes a described subprocess.
///
/// Implementations return `Err` only when the command could not be run
/// to completion (spawn failure, timeout, cancellation). A non-zero exit
/// is reported through [`SubprocessResult::success`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: SubprocessBuilder) -> Result<SubprocessResult, ServiceError>;
}

/// Runs commands on the host, attaching a shared cancellation token.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cancel: CancelToken,
}

impl SystemRunner {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// Token observed by every command this runner starts.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: SubprocessBuilder) -> Result<SubprocessResult, ServiceError> {
        command.cancel_token(self.cancel.clone()).run()
    }
}

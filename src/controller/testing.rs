//! Scripted `CommandRunner` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ServiceError;
use crate::executor::{CommandRunner, SubprocessBuilder, SubprocessResult};

pub(crate) enum Reply {
    Exit { code: i32, stdout: String, stderr: String },
    SpawnError,
}

impl Reply {
    pub(crate) fn ok(stdout: &str) -> Self {
        Self::Exit {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub(crate) fn exit(code: i32, stdout: &str, stderr: &str) -> Self {
        Self::Exit {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }
}

/// Replies keyed by the argument line (`"is-active nginx"`); unscripted
/// commands succeed with empty output.
#[derive(Default)]
pub(crate) struct StubRunner {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl StubRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, args: &str, reply: Reply) -> Self {
        self.replies.insert(args.to_string(), reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, command: SubprocessBuilder) -> Result<SubprocessResult, ServiceError> {
        self.calls.lock().unwrap().push(command.display_line());
        match self.replies.get(&command.arguments().join(" ")) {
            Some(Reply::SpawnError) => Err(ServiceError::execution_failed(format!(
                "Failed to spawn {}",
                command.program()
            ))),
            Some(Reply::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(SubprocessResult {
                success: *code == 0,
                exit_code: Some(*code),
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            None => Ok(SubprocessResult {
                success: true,
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }
}

//! Command executor module.
//!
//! Handles subprocess spawning with timeouts and cancellation, and the
//! `CommandRunner` seam the controller executes through.

mod cancel;
mod output;
mod runner;
mod subprocess;

pub use cancel::CancelToken;
pub use output::{combined_output, sanitize_output};
pub use runner::{CommandRunner, SystemRunner};
pub use subprocess::{SubprocessBuilder, SubprocessResult};

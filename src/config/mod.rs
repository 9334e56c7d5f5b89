//! Configuration module.
//!
//! Two kinds of configuration live here:
//! - [`ServiceConfig`]: the JSON file describing one managed service
//!   (brokers, database cluster, log level).
//! - [`Settings`]: TOML settings for svcctl itself.

mod service_config;
mod settings;

pub use service_config::*;
pub use settings::*;

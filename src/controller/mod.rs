//! Service controller.
//!
//! Translates operations on [`Service`](crate::services::Service)
//! descriptors into service-manager and package-manager invocations:
//! - `is-active` / `is-enabled` probes
//! - `start` / `stop`
//! - package `install -y` / `remove -y`
//! - package info queries for the installed version
//!
//! Batch operations iterate a [`ServiceMap`](crate::services::ServiceMap)
//! and are best-effort: failures are logged, never returned.

mod batch;
mod package;
mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use package::parse_package_version;
pub use service::ServiceController;

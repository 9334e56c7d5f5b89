//! Service descriptors and their runtime state.
//!
//! A [`Service`] names a systemd unit, the package providing it, and
//! the configuration it runs with. Descriptors arrive from outside
//! (a services file or any JSON-shaped value) through [`to_service`].

mod loader;
mod model;
mod status;

pub use loader::{load_services, to_service};
pub use model::{Service, ServiceMap, ServiceStatus};
pub use status::ServiceState;

//! Input validation module.
//!
//! Names end up as arguments to `systemctl` and `apt`; they are checked
//! here before anything is spawned.

mod package_name;
mod service_name;

pub use package_name::validate_package_name;
pub use service_name::validate_service_name;

//! Service (systemd unit) name validation.

use crate::error::{ServiceError, ValidationErrorKind};

/// Longest unit name systemd accepts.
const MAX_UNIT_NAME_LENGTH: usize = 256;

fn invalid(name: &str, message: &str) -> ServiceError {
    ServiceError::Validation {
        kind: ValidationErrorKind::InvalidServiceName {
            name: name.to_string(),
            message: message.to_string(),
        },
    }
}

/// Validate that a name can safely be passed to the service manager.
///
/// # Example
///
/// ```
/// use svcctl::validation::validate_service_name;
///
/// assert!(validate_service_name("nginx").is_ok());
/// assert!(validate_service_name("getty@tty1.service").is_ok());
/// assert!(validate_service_name("nginx; rm -rf /").is_err());
/// ```
pub fn validate_service_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(invalid(name, "Service name cannot be empty"));
    }

    if name.len() > MAX_UNIT_NAME_LENGTH {
        return Err(invalid(name, "Service name is too long"));
    }

    // Would be parsed as an option.
    if name.starts_with('-') {
        return Err(invalid(name, "Service name cannot start with '-'"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.' | '\\' | '@'))
    {
        return Err(invalid(name, "Service name contains invalid characters"));
    }

    Ok(())
}

//! Package name validation.

use crate::error::{ServiceError, ValidationErrorKind};

fn invalid(name: &str, message: &str) -> ServiceError {
    ServiceError::Validation {
        kind: ValidationErrorKind::InvalidPackageName {
            name: name.to_string(),
            message: message.to_string(),
        },
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ':')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | ':' | '~')
}

/// Validate that a name can safely be passed to the package manager.
///
/// Accepts Debian package names with an optional architecture suffix
/// (`libc6:amd64`) or version pin (`nginx=1.18.0-0ubuntu1`).
///
/// # Example
///
/// ```
/// use svcctl::validation::validate_package_name;
///
/// assert!(validate_package_name("mosquitto").is_ok());
/// assert!(validate_package_name("nginx=1.18.0-0ubuntu1").is_ok());
/// assert!(validate_package_name("-o=APT::Get::Assume-Yes").is_err());
/// ```
pub fn validate_package_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(invalid(name, "Package name cannot be empty"));
    }

    let (base, version) = match name.split_once('=') {
        Some((base, version)) => (base, Some(version)),
        None => (name, None),
    };

    if !base.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Err(invalid(name, "Package name must start with a letter or digit"));
    }

    if !base.chars().all(is_name_char) {
        return Err(invalid(name, "Package name contains invalid characters"));
    }

    if let Some(version) = version {
        if version.is_empty() || !version.chars().all(is_version_char) {
            return Err(invalid(name, "Package version pin is malformed"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_packages() {
        assert!(validate_package_name("nginx").is_ok());
        assert!(validate_package_name("redis-server").is_ok());
        assert!(validate_package_name("libstdc++6").is_ok());
        assert!(validate_package_name("php8.3-fpm").is_ok());
        assert!(validate_package_name("libc6:amd64").is_ok());
        assert!(validate_package_name("nginx=1.18.0-0ubuntu1").is_ok());
        assert!(validate_package_name("foo=1:2.0~rc1").is_ok());
    }

    #[test]
    fn test_empty_package_name() {
        assert!(matches!(
            validate_package_name(""),
            Err(ServiceError::Validation {
                kind: ValidationErrorKind::InvalidPackageName { .. }
            })
        ));
    }

    #[test]
    fn test_dangerous_names() {
        assert!(validate_package_name("-y").is_err());
        assert!(validate_package_name("../evil.deb").is_err());
        assert!(validate_package_name("nginx;reboot").is_err());
        assert!(validate_package_name("nginx nginx-extras").is_err());
        assert!(validate_package_name("Nginx").is_err());
    }

    #[test]
    fn test_malformed_version_pin() {
        assert!(validate_package_name("nginx=").is_err());
        assert!(validate_package_name("nginx=1.0=2").is_err());
        assert!(validate_package_name("nginx=1.0 && reboot").is_err());
    }
}

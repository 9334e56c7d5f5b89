//! Building service descriptors from external input.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ServiceError;

use super::model::{Service, ServiceMap};

/// Convert any JSON-shaped value into a [`Service`].
///
/// The value is serialized to JSON and read back as a `Service`, so
/// maps, `serde_json::Value`s and foreign structs with the same shape
/// all work. Keys the descriptor does not know are ignored; keys it
/// knows but with the wrong type are a `Serialization` error.
pub fn to_service<T>(value: &T) -> Result<Service, ServiceError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_value(value)?;
    Ok(serde_json::from_value(json)?)
}

/// Load a services file: a JSON object of service descriptors.
///
/// An entry without a `name` takes its key as name.
pub fn load_services<P: AsRef<Path>>(path: P) -> Result<ServiceMap, ServiceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

    let mut services = ServiceMap::with_capacity(entries.len());
    for (key, value) in entries {
        let mut service = to_service(&value)?;
        if service.name.is_empty() {
            service.name = key.clone();
        }
        debug!(key = %key, service = %service.name, package = %service.package_name, "Loaded service descriptor");
        services.insert(key, service);
    }

    info!(path = %path.display(), count = services.len(), "Services loaded");

    Ok(services)
}

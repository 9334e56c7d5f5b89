//! Service state as reported by the service manager.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a service, derived from `is-active` / `is-enabled` probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Failed,
    Stopped,
    Missing,
}

impl ServiceState {
    /// Map probe output to a state.
    ///
    /// `is-active` takes precedence: `failed` and `active` decide the
    /// state without consulting `is-enabled`, which is only evaluated
    /// otherwise.
    pub fn from_probes<F>(is_active: &str, is_enabled: F) -> Self
    where
        F: FnOnce() -> String,
    {
        Self::from_is_active(is_active).unwrap_or_else(|| Self::from_is_enabled(&is_enabled()))
    }

    /// State decided by `is-active` alone, if any.
    pub fn from_is_active(output: &str) -> Option<Self> {
        match output.trim() {
            "failed" => Some(Self::Failed),
            "active" => Some(Self::Running),
            _ => None,
        }
    }

    /// Fallback state from `is-enabled`.
    pub fn from_is_enabled(output: &str) -> Self {
        match output.trim() {
            "disabled" => Self::Stopped,
            _ => Self::Missing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

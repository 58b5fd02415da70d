//! Core error types for pushlock-core.
//!
//! Detection failures below the arbitrator are recovered locally through
//! fallback, so most of these only ever reach a log line. The enums exist so
//! that platform adapters and the configuration layer can report precisely
//! what went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for callers of pushlock-core. The CLI reports every
/// failure through this type.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Could not resolve the configuration directory
    #[error("Could not resolve configuration directory: {0}")]
    NoDataDir(String),
}

/// Errors raised by the platform capability layer.
///
/// Mirrors the failure taxonomy of the detection pipeline: a denied
/// permission, a missing capability, or an analyzer that could not be
/// brought up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Camera or motion access was refused by the user
    #[error("{capability} permission denied")]
    PermissionDenied { capability: Capability },

    /// The required sensor or API does not exist on this platform
    #[error("{0} is not available on this platform")]
    CapabilityUnavailable(Capability),

    /// The capability exists but could not be started
    #[error("Failed to initialize {capability}: {message}")]
    InitializationFailed {
        capability: Capability,
        message: String,
    },

    /// A frame could not be read from an open camera stream
    #[error("No frame available from camera stream {stream}")]
    FrameUnavailable { stream: u32 },
}

/// Capability named in a [`PlatformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Camera,
    Motion,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Camera => write!(f, "camera"),
            Capability::Motion => write!(f, "motion sensor"),
        }
    }
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_error_messages_name_the_capability() {
        let err = PlatformError::PermissionDenied {
            capability: Capability::Camera,
        };
        assert_eq!(err.to_string(), "camera permission denied");

        let err = PlatformError::CapabilityUnavailable(Capability::Motion);
        assert_eq!(err.to_string(), "motion sensor is not available on this platform");
    }

    #[test]
    fn config_error_converts_into_core_error() {
        let core: CoreError = ConfigError::UnknownKey("challenge.nope".into()).into();
        assert!(matches!(core, CoreError::Config(_)));
        assert!(core.to_string().contains("challenge.nope"));
    }

    #[test]
    fn custom_error_displays_bare_message() {
        assert_eq!(CoreError::Custom("unknown key: x".into()).to_string(), "unknown key: x");
    }
}

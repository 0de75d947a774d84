//! Unified error handling for modloader
//!
//! This module provides the single error type shared by the event bus,
//! the module manager and the configuration layer.

use std::fmt;

/// Unified error types for the loader
#[derive(Debug)]
pub enum LoaderError {
    /// A module list or module name was rejected
    InvalidArgument(String),

    /// No listener produced an instance for the named module
    ModuleInitialization(String),

    /// A listener failed while handling an event
    Listener(String),

    /// Configuration-related errors
    Configuration(String),

    /// File and I/O errors
    Io(std::io::Error),

    /// Internal system errors
    Internal(String),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            LoaderError::ModuleInitialization(name) => {
                write!(f, "Module ({name}) could not be initialized")
            }
            LoaderError::Listener(msg) => write!(f, "Listener error: {msg}"),
            LoaderError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            LoaderError::Io(err) => write!(f, "I/O error: {err}"),
            LoaderError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoaderError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::Io(err)
    }
}

impl From<serde_yaml::Error> for LoaderError {
    fn from(err: serde_yaml::Error) -> Self {
        LoaderError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for LoaderError {
    fn from(err: validator::ValidationErrors) -> Self {
        LoaderError::Configuration(err.to_string())
    }
}

/// Result type alias for loader operations
pub type LoaderResult<T> = std::result::Result<T, LoaderError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> LoaderResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> LoaderResult<T> {
        self.map_err(|e| LoaderError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::LoaderError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::LoaderError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! invalid_argument {
    ($msg:expr) => {
        $crate::core::error::LoaderError::InvalidArgument($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::LoaderError::InvalidArgument(format!($fmt, $($arg)*))
    };
}

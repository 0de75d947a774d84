//! Core abstractions and interfaces for modloader
//!
//! This module provides the error type, the event context, the module
//! handle and the listener traits shared by every other layer.

pub mod error;
pub mod event;
pub mod instance;
pub mod traits;

// Re-export commonly used types
pub use error::{ErrorContext, LoaderError, LoaderResult};
pub use event::ModuleEvent;
pub use instance::ModuleInstance;
pub use traits::*;

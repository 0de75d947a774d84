//! This crate contains the module loading core of an application framework.
//!
//! A [`ModuleManager`] resolves an ordered list of module names into module
//! instances by publishing events on an [`EventManager`], caching every
//! instance it obtains.

pub mod config;
pub mod core;
pub mod event;
pub mod logging;
pub mod module;

pub use crate::core::{LoaderError, LoaderResult, ModuleEvent, ModuleInstance};
pub use crate::event::{EventManager, SharedEventManager};
pub use crate::module::{FactoryResolver, ModuleEntry, ModuleManager};

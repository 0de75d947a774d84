//! Module loading
//!
//! The [`ModuleManager`] walks a list of module names and resolves each one
//! through the event manager:
//!
//! ```text
//! loadModules -> (per module) loadModule.resolve -> loadModule -> loadModules.post
//! ```
//!
//! Resolution is delegated to listeners of `loadModule.resolve`; the first
//! listener that returns an instance wins. [`FactoryResolver`] is the
//! stock resolver.

pub mod entry;
pub mod loader;
pub mod manager;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use entry::{validate_module_name, ModuleEntry};
pub use loader::{BatchLoader, SequentialBatchLoader};
pub use manager::{ModuleManager, ResolutionState, MODULE_MANAGER_IDENTIFIERS};
pub use resolver::FactoryResolver;

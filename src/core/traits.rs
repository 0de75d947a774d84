//! Core traits for modloader components
//!
//! This module defines the interfaces that decouple the event bus from
//! the listeners that resolve and observe modules.

use serde_yaml::Value as YamlValue;

use super::{error::LoaderResult, event::ModuleEvent, instance::ModuleInstance};

/// Trait for event listeners attached to an event manager
///
/// A listener returns `Some(instance)` when it produced a module and
/// `None` otherwise. Informational events ignore the returned value.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &mut ModuleEvent) -> LoaderResult<Option<ModuleInstance>>;
}

impl<F> EventListener for F
where
    F: Fn(&mut ModuleEvent) -> LoaderResult<Option<ModuleInstance>> + Send + Sync,
{
    fn on_event(&self, event: &mut ModuleEvent) -> LoaderResult<Option<ModuleInstance>> {
        self(event)
    }
}

/// Module factory function type
pub type ModuleCreateFn = fn(YamlValue) -> LoaderResult<ModuleInstance>;

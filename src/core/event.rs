//! Module event context
//!
//! This module provides the ModuleEvent that is handed to every listener
//! during module loading and carries the module currently being resolved.

use std::{any::Any, collections::HashMap, sync::Arc};

use super::instance::ModuleInstance;

/// Triggered once before the batch is loaded
pub const LOAD_MODULES: &str = "loadModules";

/// Triggered to resolve a single module name to an instance
pub const LOAD_MODULE_RESOLVE: &str = "loadModule.resolve";

/// Triggered after a single module has been resolved
pub const LOAD_MODULE: &str = "loadModule";

/// Triggered once after every module in the batch has been loaded
pub const LOAD_MODULES_POST: &str = "loadModules.post";

/// Context passed to listeners of module loading events
#[derive(Clone, Default)]
pub struct ModuleEvent {
    /// Name of the event currently being dispatched
    name: String,

    /// Name of the module currently being loaded
    module_name: Option<String>,

    /// Instance of the module currently being loaded, once resolved
    module: Option<ModuleInstance>,

    /// Set by a listener to stop the remaining listeners from running
    propagation_stopped: bool,

    /// Custom values shared between listeners (type-erased, thread-safe)
    params: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ModuleEvent {
    /// Create an empty event
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an event that keeps only the custom params of `other`
    pub fn with_params_of(other: &ModuleEvent) -> Self {
        Self {
            params: other.params.clone(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn set_module_name(&mut self, name: impl Into<String>) {
        self.module_name = Some(name.into());
    }

    pub fn module(&self) -> Option<&ModuleInstance> {
        self.module.as_ref()
    }

    pub fn set_module(&mut self, module: ModuleInstance) {
        self.module = Some(module);
    }

    pub fn clear_module(&mut self) {
        self.module = None;
    }

    /// Stop any listeners after the current one from running
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_is_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn reset_propagation(&mut self) {
        self.propagation_stopped = false;
    }

    /// Store a typed value into the event
    pub fn set_param<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.params.insert(key.into(), Arc::new(value));
    }

    /// Get a typed reference from the event
    pub fn param<T: Any>(&self, key: &str) -> Option<&T> {
        self.params.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Get a string slice if the stored value is a `String`
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param::<String>(key).map(|s| s.as_str())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn remove_param(&mut self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.params.remove(key)
    }
}

impl std::fmt::Debug for ModuleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();
        f.debug_struct("ModuleEvent")
            .field("name", &self.name)
            .field("module_name", &self.module_name)
            .field("module", &self.module)
            .field("propagation_stopped", &self.propagation_stopped)
            .field("params", &keys)
            .finish()
    }
}

//! Factory-backed module resolver
//!
//! Answers `loadModule.resolve` by looking the module name up in a table
//! of factory functions and calling the factory with that module's
//! configured options.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use log::{debug, error};
use serde_yaml::Value as YamlValue;

use crate::{
    core::{
        event::LOAD_MODULE_RESOLVE, EventListener, LoaderError, LoaderResult, ModuleCreateFn,
        ModuleEvent, ModuleInstance,
    },
    event::{EventManager, ListenerHandle},
};

/// Resolver listener that builds modules from registered factories
///
/// Names without a factory resolve to `None`, leaving them to any
/// lower-priority resolver. A failing factory aborts the resolution with
/// a `Listener` error naming the module.
#[derive(Default)]
pub struct FactoryResolver {
    factories: DashMap<String, ModuleCreateFn>,
    options: DashMap<String, YamlValue>,
}

impl FactoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module factory
    pub fn register_factory(&self, name: impl Into<String>, factory: ModuleCreateFn) {
        let name = name.into();
        debug!("Registering factory for module {}", name);
        self.factories.insert(name, factory);
    }

    pub fn has_factory(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Set the options passed to one module's factory
    pub fn set_options(&self, name: impl Into<String>, options: YamlValue) {
        self.options.insert(name.into(), options);
    }

    /// Replace the options of every module
    pub fn load_options(&self, options: &HashMap<String, YamlValue>) {
        self.options.clear();
        for (name, value) in options {
            self.options.insert(name.clone(), value.clone());
        }
    }

    /// Options for a module, `Null` when none were set
    pub fn options(&self, name: &str) -> YamlValue {
        self.options
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or(YamlValue::Null)
    }

    /// Build a module directly, outside of event dispatch
    pub fn create_module(&self, name: &str) -> LoaderResult<Option<ModuleInstance>> {
        let Some(factory) = self.factories.get(name).map(|entry| *entry.value()) else {
            return Ok(None);
        };

        factory(self.options(name)).map(Some).map_err(|e| {
            error!("Failed to create module {}: {}", name, e);
            LoaderError::Listener(format!("module {name} factory failed: {e}"))
        })
    }

    /// Attach this resolver to `loadModule.resolve`
    pub fn attach_to(self: &Arc<Self>, events: &EventManager, priority: i32) -> ListenerHandle {
        events.attach_listener(LOAD_MODULE_RESOLVE, self.clone(), priority)
    }
}

impl EventListener for FactoryResolver {
    fn on_event(&self, event: &mut ModuleEvent) -> LoaderResult<Option<ModuleInstance>> {
        match event.module_name() {
            Some(name) => self.create_module(name),
            None => Ok(None),
        }
    }
}

//! Module manager
//!
//! Resolves an ordered list of module names to instances through the event
//! manager and caches every instance it obtains. Module construction itself
//! is left to whichever listener answers `loadModule.resolve`.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info, warn};

use crate::{
    core::{
        event::{LOAD_MODULE, LOAD_MODULES, LOAD_MODULES_POST, LOAD_MODULE_RESOLVE},
        LoaderError, LoaderResult, ModuleEvent, ModuleInstance,
    },
    event::EventManager,
};

use super::{
    entry::{validate_module_name, ModuleEntry},
    loader::{BatchLoader, SequentialBatchLoader},
};

/// Identifiers the manager tags its event manager with, so shared
/// listeners can target module loading without holding the manager
pub const MODULE_MANAGER_IDENTIFIERS: [&str; 2] = ["ModuleManager", "modloader::ModuleManager"];

/// Progress of the most recent single-module resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionState {
    /// Nothing has been resolved yet
    #[default]
    Unset,
    /// A resolution started and has not finished
    InProgress,
    /// The last resolution finished successfully
    Complete,
}

pub struct ModuleManager {
    modules: Vec<ModuleEntry>,
    loaded: HashMap<String, ModuleInstance>,
    modules_loaded: bool,
    resolution: ResolutionState,
    event: ModuleEvent,
    /// Shared event as it was when the current resolution began
    checkpoint: ModuleEvent,
    events: Arc<EventManager>,
    batch_loader: Arc<dyn BatchLoader>,
}

impl ModuleManager {
    /// Create a manager for `modules`, driven by `events`
    ///
    /// # Errors
    /// Returns `InvalidArgument` when a module name is malformed
    pub fn new<I, E>(modules: I, events: Arc<EventManager>) -> LoaderResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<ModuleEntry>,
    {
        let modules = Self::collect_modules(modules)?;

        let mut manager = Self {
            modules,
            loaded: HashMap::new(),
            modules_loaded: false,
            resolution: ResolutionState::Unset,
            event: ModuleEvent::new(),
            checkpoint: ModuleEvent::new(),
            events: events.clone(),
            batch_loader: Arc::new(SequentialBatchLoader),
        };
        manager.set_event_manager(events);
        Ok(manager)
    }

    fn collect_modules<I, E>(modules: I) -> LoaderResult<Vec<ModuleEntry>>
    where
        I: IntoIterator<Item = E>,
        E: Into<ModuleEntry>,
    {
        let modules: Vec<ModuleEntry> = modules.into_iter().map(Into::into).collect();
        for entry in &modules {
            entry.validate()?;
        }
        Ok(modules)
    }

    /// Load every configured module once
    ///
    /// Triggers `loadModules`, runs the batch loader, then triggers
    /// `loadModules.post`. Calling it again after a successful run does
    /// nothing. The first failure aborts the batch and leaves it
    /// unfinished, so a later call starts over with the modules that are
    /// not cached yet.
    ///
    /// The batch counts as loaded once the batch loader succeeds. An error
    /// from a `loadModules.post` listener is returned, but later calls
    /// neither reload the modules nor trigger `loadModules.post` again.
    pub fn load_modules(&mut self) -> LoaderResult<&mut Self> {
        if self.modules_loaded {
            debug!("Modules already loaded, skipping");
            return Ok(self);
        }

        info!("Loading {} modules...", self.modules.len());

        let events = self.events.clone();
        events.trigger(LOAD_MODULES, &mut self.event)?;

        let loader = self.batch_loader.clone();
        loader.load(self)?;
        self.modules_loaded = true;

        events.trigger(LOAD_MODULES_POST, &mut self.event)?;

        info!("Successfully loaded {} modules", self.loaded.len());
        Ok(self)
    }

    /// Resolve a single module by name
    ///
    /// A cached module is returned as is, without triggering any event.
    ///
    /// # Errors
    /// Returns `ModuleInitialization` when no listener produced an instance,
    /// or the error of a failing listener. The cache is left untouched.
    pub fn load_module(&mut self, name: &str) -> LoaderResult<ModuleInstance> {
        if let Some(module) = self.loaded.get(name) {
            return Ok(module.clone());
        }

        self.begin_resolution(name);

        let events = self.events.clone();
        let responses =
            events.trigger_until(LOAD_MODULE_RESOLVE, &mut self.event, |r| r.is_some())?;

        let Some(module) = responses.last().cloned() else {
            warn!("No listener could resolve module {}", name);
            return Err(LoaderError::ModuleInitialization(name.to_string()));
        };

        self.finish_resolution(name, module)
    }

    /// Register a module the caller already constructed
    ///
    /// Skips `loadModule.resolve` but still triggers `loadModule`. A name
    /// that is already cached keeps its first instance.
    pub fn load_module_instance(
        &mut self,
        name: &str,
        module: ModuleInstance,
    ) -> LoaderResult<ModuleInstance> {
        if let Some(existing) = self.loaded.get(name) {
            return Ok(existing.clone());
        }

        validate_module_name(name)?;
        self.begin_resolution(name);
        self.finish_resolution(name, module)
    }

    /// Load one entry of the module list
    pub fn load_entry(&mut self, entry: &ModuleEntry) -> LoaderResult<ModuleInstance> {
        match entry {
            ModuleEntry::Name(name) => self.load_module(name),
            ModuleEntry::Instance { name, module } => {
                self.load_module_instance(name, module.clone())
            }
        }
    }

    fn begin_resolution(&mut self, name: &str) {
        // an aborted resolution may have left params on the shared event;
        // restart from the params it began with
        if self.resolution == ResolutionState::InProgress {
            debug!("Previous resolution did not complete, restoring event params");
            self.event = ModuleEvent::with_params_of(&self.checkpoint);
        } else {
            self.checkpoint = ModuleEvent::with_params_of(&self.event);
        }

        self.event.set_module_name(name);
        self.event.clear_module();
        self.resolution = ResolutionState::InProgress;
    }

    fn finish_resolution(
        &mut self,
        name: &str,
        module: ModuleInstance,
    ) -> LoaderResult<ModuleInstance> {
        self.event.set_module(module.clone());

        let events = self.events.clone();
        events.trigger(LOAD_MODULE, &mut self.event)?;

        debug!("Loaded module {}", name);
        self.loaded.insert(name.to_string(), module.clone());
        self.resolution = ResolutionState::Complete;

        Ok(module)
    }

    /// Loaded modules keyed by name, loading the batch first when
    /// `force_load` is set
    pub fn loaded_modules(
        &mut self,
        force_load: bool,
    ) -> LoaderResult<&HashMap<String, ModuleInstance>> {
        if force_load {
            self.load_modules()?;
        }
        Ok(&self.loaded)
    }

    /// Cached instance of a module, never triggers a resolution
    pub fn module(&self, name: &str) -> Option<ModuleInstance> {
        self.loaded.get(name).cloned()
    }

    /// Configured module entries, in load order
    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    /// Configured module names, in load order
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(ModuleEntry::name).collect()
    }

    /// Replace the module list
    ///
    /// # Errors
    /// Returns `InvalidArgument` when a module name is malformed; the
    /// current list is kept in that case.
    pub fn set_modules<I, E>(&mut self, modules: I) -> LoaderResult<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<ModuleEntry>,
    {
        self.modules = Self::collect_modules(modules)?;
        Ok(())
    }

    /// Whether a batch load has completed
    pub fn is_loaded(&self) -> bool {
        self.modules_loaded
    }

    pub fn resolution_state(&self) -> ResolutionState {
        self.resolution
    }

    /// The event shared by every module resolution
    pub fn event(&self) -> &ModuleEvent {
        &self.event
    }

    pub fn event_mut(&mut self) -> &mut ModuleEvent {
        &mut self.event
    }

    /// Replace the shared event
    pub fn set_event(&mut self, event: ModuleEvent) {
        self.checkpoint = ModuleEvent::with_params_of(&event);
        self.event = event;
    }

    pub fn event_manager(&self) -> &Arc<EventManager> {
        &self.events
    }

    /// Install the event manager that drives module loading
    ///
    /// The manager is tagged with [`MODULE_MANAGER_IDENTIFIERS`]. Listeners
    /// attached to a previous event manager stay there.
    pub fn set_event_manager(&mut self, events: Arc<EventManager>) {
        events.add_identifiers(MODULE_MANAGER_IDENTIFIERS);
        self.events = events;
    }

    /// Replace the strategy used by [`load_modules`](Self::load_modules)
    pub fn set_batch_loader(&mut self, loader: Arc<dyn BatchLoader>) {
        self.batch_loader = loader;
    }
}

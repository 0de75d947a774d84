//! Batch loading strategies
//!
//! [`ModuleManager::load_modules`] delegates the iteration over the module
//! list to a [`BatchLoader`], so callers can change how a batch is walked
//! without touching the manager.

use log::debug;

use crate::core::LoaderResult;

use super::manager::ModuleManager;

/// Strategy that loads the configured module list
pub trait BatchLoader: Send + Sync {
    /// Load the manager's modules, stopping at the first failure
    fn load(&self, manager: &mut ModuleManager) -> LoaderResult<()>;
}

/// Loads every entry in list order
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialBatchLoader;

impl BatchLoader for SequentialBatchLoader {
    fn load(&self, manager: &mut ModuleManager) -> LoaderResult<()> {
        let entries = manager.modules().to_vec();
        for entry in &entries {
            debug!("Loading module {}", entry.name());
            manager.load_entry(entry)?;
        }
        Ok(())
    }
}

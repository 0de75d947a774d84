//! Shared event manager
//!
//! Holds listeners keyed by identifier rather than by manager instance, so
//! code that never sees a particular `EventManager` can still listen to it.
//! An `EventManager` built with [`EventManager::with_shared_manager`] pulls
//! in the shared listeners registered under any of its identifiers, plus
//! those registered under the `*` wildcard.
//!
//! [`EventManager::with_shared_manager`]: super::EventManager::with_shared_manager

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use log::debug;

use super::ListenerEntry;
use crate::core::{EventListener, LoaderResult, ModuleEvent, ModuleInstance};

/// Identifier matching every event manager
pub const WILDCARD: &str = "*";

/// Handle returned by [`SharedEventManager::attach`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SharedListenerHandle {
    identifier: String,
    event: String,
    id: u64,
}

impl SharedListenerHandle {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

#[derive(Default)]
pub struct SharedEventManager {
    listeners: DashMap<(String, String), Vec<ListenerEntry>>,
    next_id: AtomicU64,
}

impl SharedEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a closure listener for `event` on managers tagged `identifier`
    pub fn attach<F>(
        &self,
        identifier: &str,
        event: &str,
        listener: F,
        priority: i32,
    ) -> SharedListenerHandle
    where
        F: Fn(&mut ModuleEvent) -> LoaderResult<Option<ModuleInstance>> + Send + Sync + 'static,
    {
        self.attach_listener(identifier, event, Arc::new(listener), priority)
    }

    pub fn attach_listener(
        &self,
        identifier: &str,
        event: &str,
        listener: Arc<dyn EventListener>,
        priority: i32,
    ) -> SharedListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Attaching shared listener {} to {}::{} with priority {}",
            id, identifier, event, priority
        );

        self.listeners
            .entry((identifier.to_string(), event.to_string()))
            .or_default()
            .push(ListenerEntry {
                id,
                priority,
                listener,
            });

        SharedListenerHandle {
            identifier: identifier.to_string(),
            event: event.to_string(),
            id,
        }
    }

    pub fn detach(&self, handle: &SharedListenerHandle) -> bool {
        let key = (handle.identifier.clone(), handle.event.clone());
        let Some(mut entries) = self.listeners.get_mut(&key) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != handle.id);
        let removed = entries.len() != before;
        drop(entries);

        self.listeners.remove_if(&key, |_, entries| entries.is_empty());
        removed
    }

    /// Remove the listeners of an identifier, for one event or for all of them
    pub fn clear_listeners(&self, identifier: &str, event: Option<&str>) {
        match event {
            Some(event) => {
                self.listeners
                    .remove(&(identifier.to_string(), event.to_string()));
            }
            None => self.listeners.retain(|(id, _), _| id != identifier),
        }
    }

    pub fn listener_count(&self, identifier: &str, event: &str) -> usize {
        self.listeners
            .get(&(identifier.to_string(), event.to_string()))
            .map_or(0, |entries| entries.len())
    }

    /// Listeners for `event` registered under any of `identifiers` or the
    /// wildcard, in attach order. An identifier listed twice contributes its
    /// listeners once.
    pub(crate) fn listeners_for(&self, identifiers: &[String], event: &str) -> Vec<ListenerEntry> {
        let mut found: Vec<ListenerEntry> = Vec::new();

        let keys = identifiers
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(WILDCARD));
        for identifier in keys {
            if let Some(entries) = self
                .listeners
                .get(&(identifier.to_string(), event.to_string()))
            {
                for entry in entries.iter() {
                    if !found.iter().any(|f| f.id == entry.id) {
                        found.push(entry.clone());
                    }
                }
            }
        }

        found.sort_by_key(|entry| entry.id);
        found
    }
}

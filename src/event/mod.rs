//! Event manager
//!
//! Named-event publish/subscribe used to drive module loading. Listeners
//! are attached with a priority (higher runs first, ties run in attach
//! order) and a trigger can be cut short either by a predicate over the
//! listener return values or by a listener stopping propagation.

pub mod response;
pub mod shared;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use log::debug;

use crate::core::{EventListener, LoaderResult, ModuleEvent, ModuleInstance};

pub use response::ResponseCollection;
pub use shared::{SharedEventManager, SharedListenerHandle};

/// Priority used when a caller has no ordering preference
pub const DEFAULT_PRIORITY: i32 = 1;

/// Handle returned by [`EventManager::attach`], used to detach the listener
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    event: String,
    id: u64,
}

impl ListenerHandle {
    pub fn event(&self) -> &str {
        &self.event
    }
}

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) id: u64,
    pub(crate) priority: i32,
    pub(crate) listener: Arc<dyn EventListener>,
}

/// Event manager that dispatches module events to attached listeners
pub struct EventManager {
    listeners: DashMap<String, Vec<ListenerEntry>>,
    identifiers: ArcSwap<Vec<String>>,
    shared: Option<Arc<SharedEventManager>>,
    next_id: AtomicU64,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    /// Create an event manager with no listeners
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            identifiers: ArcSwap::from_pointee(Vec::new()),
            shared: None,
            next_id: AtomicU64::new(0),
        }
    }

    /// Create an event manager that also dispatches to shared listeners
    /// registered under any of its identifiers
    pub fn with_shared_manager(shared: Arc<SharedEventManager>) -> Self {
        Self {
            shared: Some(shared),
            ..Self::new()
        }
    }

    pub fn shared_manager(&self) -> Option<&Arc<SharedEventManager>> {
        self.shared.as_ref()
    }

    /// Replace the identifiers this manager answers to
    pub fn set_identifiers<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = Vec::new();
        for id in identifiers.into_iter().map(Into::into) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.identifiers.store(Arc::new(ids));
    }

    /// Add identifiers, keeping the ones already set
    pub fn add_identifiers<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let added: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        self.identifiers.rcu(|current| {
            let mut ids: Vec<String> = (**current).clone();
            for id in &added {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
            ids
        });
    }

    pub fn identifiers(&self) -> Vec<String> {
        (**self.identifiers.load()).clone()
    }

    /// Attach a closure listener
    pub fn attach<F>(&self, event: &str, listener: F, priority: i32) -> ListenerHandle
    where
        F: Fn(&mut ModuleEvent) -> LoaderResult<Option<ModuleInstance>> + Send + Sync + 'static,
    {
        self.attach_listener(event, Arc::new(listener), priority)
    }

    /// Attach a listener object
    pub fn attach_listener(
        &self,
        event: &str,
        listener: Arc<dyn EventListener>,
        priority: i32,
    ) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("Attaching listener {} to event {} with priority {}", id, event, priority);

        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(ListenerEntry {
                id,
                priority,
                listener,
            });

        ListenerHandle {
            event: event.to_string(),
            id,
        }
    }

    /// Detach a listener, returns false when it was not attached
    pub fn detach(&self, handle: &ListenerHandle) -> bool {
        let Some(mut entries) = self.listeners.get_mut(&handle.event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != handle.id);
        let removed = entries.len() != before;
        let now_empty = entries.is_empty();
        drop(entries);

        if now_empty {
            self.listeners.remove_if(&handle.event, |_, entries| entries.is_empty());
        }
        if removed {
            debug!("Detached listener {} from event {}", handle.id, handle.event);
        }
        removed
    }

    /// Remove every local listener of an event
    pub fn clear_listeners(&self, event: &str) {
        self.listeners.remove(event);
    }

    /// Number of local listeners attached to an event
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |entries| entries.len())
    }

    /// Names of events that have local listeners
    pub fn events(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .listeners
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Call every listener of `name`
    pub fn trigger(&self, name: &str, event: &mut ModuleEvent) -> LoaderResult<ResponseCollection> {
        self.trigger_until(name, event, |_| false)
    }

    /// Call the listeners of `name` until `until` returns true for a listener
    /// result or a listener stops propagation
    pub fn trigger_until<P>(
        &self,
        name: &str,
        event: &mut ModuleEvent,
        until: P,
    ) -> LoaderResult<ResponseCollection>
    where
        P: Fn(Option<&ModuleInstance>) -> bool,
    {
        event.set_name(name);
        event.reset_propagation();

        let listeners = self.listeners_for(name);
        debug!("Triggering event {} with {} listeners", name, listeners.len());

        let mut responses = ResponseCollection::default();
        for entry in listeners {
            let response = entry.listener.on_event(event)?;
            let short_circuit = until(response.as_ref());
            responses.push(response);

            if event.propagation_is_stopped() || short_circuit {
                responses.set_stopped(true);
                break;
            }
        }

        Ok(responses)
    }

    /// Snapshot of the listeners for an event, merged with shared listeners
    /// and sorted by priority. Cloned out so listeners may attach or detach
    /// while the event is being dispatched.
    fn listeners_for(&self, name: &str) -> Vec<ListenerEntry> {
        let mut listeners: Vec<ListenerEntry> = self
            .listeners
            .get(name)
            .map(|entries| entries.value().clone())
            .unwrap_or_default();

        if let Some(shared) = &self.shared {
            listeners.extend(shared.listeners_for(&self.identifiers.load(), name));
        }

        // stable: equal priorities keep attach order, local before shared
        listeners.sort_by_key(|entry| std::cmp::Reverse(entry.priority));
        listeners
    }
}

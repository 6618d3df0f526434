// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed event bus.
//!
//! Each component owns a bus over its own event enum, so the payload of every
//! event name is checked at compile time. Listeners for the same name run in
//! registration order.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// An event that can travel on an [`EventBus`]
pub trait EventArgs {
    /// Event name listeners subscribe to (e.g. `project:vertex:added`)
    fn event_name(&self) -> &str;
}

/// Listener callback
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry<E> {
    id: ListenerId,
    once: bool,
    listener: Listener<E>,
}

/// Publish/subscribe bus keyed by event name
pub struct EventBus<E> {
    listeners: IndexMap<String, Vec<Entry<E>>>,
    next_id: u64,
}

impl<E: EventArgs> EventBus<E> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            listeners: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Subscribe to an event name
    pub fn on(&mut self, name: impl Into<String>, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        self.insert(name.into(), Arc::new(listener), false)
    }

    /// Subscribe for a single delivery
    pub fn once(&mut self, name: impl Into<String>, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        self.insert(name.into(), Arc::new(listener), true)
    }

    fn insert(&mut self, name: String, listener: Listener<E>, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(name)
            .or_default()
            .push(Entry { id, once, listener });
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for entries in self.listeners.values_mut() {
            if let Some(index) = entries.iter().position(|e| e.id == id) {
                entries.remove(index);
                return true;
            }
        }
        false
    }

    /// Remove every listener of one event name
    pub fn off_all(&mut self, name: &str) {
        self.listeners.shift_remove(name);
    }

    /// Remove every listener
    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Number of listeners for an event name
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    /// Deliver an event. Returns how many listeners ran.
    pub fn emit(&mut self, event: &E) -> usize {
        let Some(entries) = self.listeners.get_mut(event.event_name()) else {
            return 0;
        };
        let fired: Vec<Listener<E>> = entries.iter().map(|e| Arc::clone(&e.listener)).collect();
        entries.retain(|e| !e.once);

        for listener in &fired {
            listener(event);
        }
        fired.len()
    }
}

impl<E: EventArgs> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(&str, usize)> = self
            .listeners
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .finish()
    }
}

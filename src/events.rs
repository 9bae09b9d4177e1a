// src/events.rs
//! Change notifications fired by a configuration.
//!
//! Every mutating operation fires two events: one before the change (with
//! `before_update` set) and one after. Listeners are called outside of the
//! configuration's lock, so they may read the configuration freely. A
//! mutation that fails fires its before-event, then an error event to the
//! error listeners instead of the after-event.

use arbor_tree::TreeNode;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock};

/// The operation an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AddProperty,
    SetProperty,
    ClearProperty,
    Clear,
    ClearTree,
    AddNodes,
}

/// Data carried by an event, depending on its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Property(Value),
    /// Subtrees added by `add_nodes` or removed by `clear_tree`.
    Nodes(Vec<TreeNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationEvent {
    pub kind: EventKind,
    /// The key of the operation; `None` for [`EventKind::Clear`].
    pub key: Option<String>,
    pub value: Option<EventValue>,
    pub before_update: bool,
}

impl ConfigurationEvent {
    pub fn new(kind: EventKind, key: Option<&str>, value: Option<EventValue>, before_update: bool) -> Self {
        Self {
            kind,
            key: key.map(str::to_string),
            value,
            before_update,
        }
    }

    pub fn property_value(&self) -> Option<&Value> {
        match &self.value {
            Some(EventValue::Property(value)) => Some(value),
            _ => None,
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        match &self.value {
            Some(EventValue::Nodes(nodes)) => nodes,
            _ => &[],
        }
    }
}

/// Reports a mutation that failed; the configuration is left unchanged.
///
/// Fired after the before-event of the operation, in place of its
/// after-event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationErrorEvent {
    pub kind: EventKind,
    pub key: Option<String>,
    pub value: Option<EventValue>,
    /// The rendered error that was returned to the caller.
    pub message: String,
}

/// Receives the events of a configuration.
pub trait ConfigurationListener: Send + Sync {
    fn configuration_changed(&self, event: &ConfigurationEvent);
}

impl<F> ConfigurationListener for F
where
    F: Fn(&ConfigurationEvent) + Send + Sync,
{
    fn configuration_changed(&self, event: &ConfigurationEvent) {
        self(event)
    }
}

/// Receives the failures of a configuration's mutations.
pub trait ConfigurationErrorListener: Send + Sync {
    fn configuration_error(&self, event: &ConfigurationErrorEvent);
}

impl<F> ConfigurationErrorListener for F
where
    F: Fn(&ConfigurationErrorEvent) + Send + Sync,
{
    fn configuration_error(&self, event: &ConfigurationErrorEvent) {
        self(event)
    }
}

/// An identity-compared list of listeners.
struct Registry<L: ?Sized> {
    entries: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for Registry<L> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> Registry<L> {
    fn add(&self, listener: Arc<L>) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    fn remove(&self, listener: &Arc<L>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        entries.retain(|registered| !Arc::ptr_eq(registered, listener));
        entries.len() != before
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// A copy of the current registrations; later changes do not show up in it.
    fn snapshot(&self) -> Vec<Arc<L>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// The listeners registered with one configuration.
#[derive(Default)]
pub(crate) struct EventSource {
    listeners: Registry<dyn ConfigurationListener>,
    error_listeners: Registry<dyn ConfigurationErrorListener>,
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listeners.len())
            .field("error_listeners", &self.error_listeners.len())
            .finish()
    }
}

impl EventSource {
    pub(crate) fn add(&self, listener: Arc<dyn ConfigurationListener>) {
        self.listeners.add(listener);
    }

    /// Removes a listener previously added; compares by identity.
    pub(crate) fn remove(&self, listener: &Arc<dyn ConfigurationListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub(crate) fn clear(&self) {
        self.listeners.clear();
    }

    pub(crate) fn listeners(&self) -> Vec<Arc<dyn ConfigurationListener>> {
        self.listeners.snapshot()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn add_error(&self, listener: Arc<dyn ConfigurationErrorListener>) {
        self.error_listeners.add(listener);
    }

    pub(crate) fn remove_error(&self, listener: &Arc<dyn ConfigurationErrorListener>) -> bool {
        self.error_listeners.remove(listener)
    }

    pub(crate) fn clear_errors(&self) {
        self.error_listeners.clear();
    }

    pub(crate) fn error_len(&self) -> usize {
        self.error_listeners.len()
    }

    pub(crate) fn fire(&self, kind: EventKind, key: Option<&str>, value: Option<EventValue>, before_update: bool) {
        // Snapshot so that listeners may (un)register while being notified.
        let listeners = self.listeners.snapshot();
        if listeners.is_empty() {
            return;
        }
        let event = ConfigurationEvent::new(kind, key, value, before_update);
        log::trace!("firing {:?} for {:?} (before: {})", kind, key, before_update);
        for listener in listeners {
            listener.configuration_changed(&event);
        }
    }

    pub(crate) fn fire_error(
        &self,
        kind: EventKind,
        key: Option<&str>,
        value: Option<EventValue>,
        error: &dyn std::error::Error,
    ) {
        let listeners = self.error_listeners.snapshot();
        if listeners.is_empty() {
            return;
        }
        let event = ConfigurationErrorEvent {
            kind,
            key: key.map(str::to_string),
            value,
            message: error.to_string(),
        };
        log::trace!("firing error for {:?} on {:?}: {}", kind, key, event.message);
        for listener in listeners {
            listener.configuration_error(&event);
        }
    }
}

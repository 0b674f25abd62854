//! Native events and listener dispatch
//!
//! Dispatch follows the DOM model:
//!
//! ```text
//! capture   root ──► ... ──► parent
//! target    target (capture listeners, then bubble listeners)
//! bubble    parent ──► ... ──► root        (only when `bubbles`)
//! ```
//!
//! Listeners receive `&mut Event` and may prevent the default action or stop
//! propagation. Panics raised inside a listener are not caught here.
//!
//! # Example
//!
//! ```rust
//! use tether_dom::{Document, Event, EventInit, ListenerOptions};
//!
//! let mut doc = Document::new();
//! let button = doc.append_element(doc.root(), "button").unwrap();
//!
//! doc.add_event_listener(button, "click", ListenerOptions::default(), |e| {
//!     e.prevent_default();
//! })
//! .unwrap();
//!
//! let init = EventInit::default().with_cancelable(true);
//! let outcome = doc.dispatch_event(button, Event::new("click", init)).unwrap();
//! assert!(!outcome.not_canceled());
//! ```

use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::document::{Document, ElementId};
use crate::error::{DomError, DomResult};

new_key_type! {
    /// Handle returned by [`Document::add_event_listener`]
    pub struct ListenerId;
}

/// Callback invoked for a dispatched event
///
/// Uses Rc since the element tree is single-threaded.
pub type EventCallback = Rc<dyn Fn(&mut Event)>;

/// Options used when constructing a synthesized event
///
/// Defaults match the DOM: neither bubbling nor cancelable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventInit {
    /// Whether the event travels back up through the ancestors
    pub bubbles: bool,
    /// Whether [`Event::prevent_default`] has any effect
    pub cancelable: bool,
}

impl EventInit {
    pub fn bubbling() -> Self {
        Self {
            bubbles: true,
            ..Self::default()
        }
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }
}

/// Dispatch phase of an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EventPhase {
    /// Not being dispatched
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// A native event travelling through the element tree
#[derive(Clone, Debug)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    target: Option<ElementId>,
    current_target: Option<ElementId>,
    phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    /// Extra readable properties, in the order they were set
    fields: IndexMap<String, Value>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, init: EventInit) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            fields: IndexMap::new(),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Element the event was dispatched on
    pub fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// Element whose listeners are currently running
    pub fn current_target(&self) -> Option<ElementId> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Cancel the default action; ignored for non-cancelable events
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop after the listeners of the current element have run
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop immediately, skipping remaining listeners on the current element
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// How a listener is registered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Run during the capture phase instead of the bubble phase
    pub capture: bool,
    /// Remove the listener after its first invocation
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }

    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }
}

/// Result of [`Document::dispatch_event`]
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    event: Event,
}

impl DispatchOutcome {
    /// `true` unless a listener prevented the default action
    ///
    /// Same meaning as the return value of the DOM's `dispatchEvent`.
    pub fn not_canceled(&self) -> bool {
        !self.event.default_prevented
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn into_event(self) -> Event {
        self.event
    }
}

struct ListenerEntry {
    element: ElementId,
    event_type: String,
    options: ListenerOptions,
    callback: EventCallback,
}

/// Listener storage, indexed by element for dispatch
#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: SlotMap<ListenerId, ListenerEntry>,
    by_element: FxHashMap<ElementId, SmallVec<[ListenerId; 4]>>,
}

impl ListenerTable {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, entry: ListenerEntry) -> ListenerId {
        let element = entry.element;
        let id = self.entries.insert(entry);
        self.by_element.entry(element).or_default().push(id);
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_element.get_mut(&entry.element) {
            ids.retain(|l| *l != id);
            if ids.is_empty() {
                self.by_element.remove(&entry.element);
            }
        }
        true
    }

    /// Drop every listener attached to an element
    pub(crate) fn remove_element(&mut self, element: ElementId) {
        if let Some(ids) = self.by_element.remove(&element) {
            for id in ids {
                self.entries.remove(id);
            }
        }
    }

    fn snapshot(&self, element: ElementId) -> SmallVec<[ListenerId; 4]> {
        self.by_element.get(&element).cloned().unwrap_or_default()
    }
}

impl Document {
    /// Attach a listener for `event_type` to `element`
    pub fn add_event_listener<F>(
        &mut self,
        element: ElementId,
        event_type: &str,
        options: ListenerOptions,
        callback: F,
    ) -> DomResult<ListenerId>
    where
        F: Fn(&mut Event) + 'static,
    {
        if !self.contains(element) {
            return Err(DomError::ElementNotFound(element));
        }
        Ok(self.listeners.insert(ListenerEntry {
            element,
            event_type: event_type.to_string(),
            options,
            callback: Rc::new(callback),
        }))
    }

    /// Detach a listener; returns false if it was already gone
    pub fn remove_event_listener(&mut self, listener: ListenerId) -> bool {
        self.listeners.remove(listener)
    }

    /// Number of listeners attached to an element
    pub fn listener_count(&self, element: ElementId) -> usize {
        self.listeners
            .by_element
            .get(&element)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    /// Dispatch an event on `target`, running capture, target and bubble phases
    pub fn dispatch_event(
        &mut self,
        target: ElementId,
        mut event: Event,
    ) -> DomResult<DispatchOutcome> {
        if !self.contains(target) {
            return Err(DomError::ElementNotFound(target));
        }

        event.target = Some(target);
        event.default_prevented = false;
        event.propagation_stopped = false;
        event.immediate_propagation_stopped = false;

        // Root first
        let mut path = self.ancestors(target);
        path.reverse();

        self.run_phases(target, &path, &mut event);

        tracing::trace!(
            "dispatched '{}' on {:?} (default_prevented={}, propagation_stopped={})",
            event.event_type,
            target,
            event.default_prevented,
            event.propagation_stopped
        );

        event.phase = EventPhase::None;
        event.current_target = None;
        Ok(DispatchOutcome { event })
    }

    fn run_phases(&mut self, target: ElementId, path: &[ElementId], event: &mut Event) {
        for &node in path {
            event.phase = EventPhase::Capturing;
            event.current_target = Some(node);
            self.invoke_listeners(node, event, true);
            if event.propagation_stopped {
                return;
            }
        }

        event.phase = EventPhase::AtTarget;
        event.current_target = Some(target);
        self.invoke_listeners(target, event, true);
        if event.propagation_stopped {
            return;
        }
        self.invoke_listeners(target, event, false);
        if event.propagation_stopped || !event.bubbles {
            return;
        }

        for &node in path.iter().rev() {
            event.phase = EventPhase::Bubbling;
            event.current_target = Some(node);
            self.invoke_listeners(node, event, false);
            if event.propagation_stopped {
                return;
            }
        }
    }

    fn invoke_listeners(&mut self, node: ElementId, event: &mut Event, capture: bool) {
        for id in self.listeners.snapshot(node) {
            let Some(entry) = self.listeners.entries.get(id) else {
                continue;
            };
            if entry.options.capture != capture || entry.event_type != event.event_type {
                continue;
            }

            let callback = Rc::clone(&entry.callback);
            if entry.options.once {
                self.listeners.remove(id);
            }

            callback(event);

            if event.immediate_propagation_stopped {
                break;
            }
        }
    }
}

//! Events synthesized by widgets
//!
//! A [`WidgetEvent`] carries a statically declared payload. On dispatch the
//! payload is serialized field by field onto a native [`Event`], next to a
//! `widget` field naming the source, and the event is dispatched on the
//! widget's element. The event type and [`EventInit`] only shape the native
//! event and never appear among its fields.
//!
//! Unlike a bare native event, a widget event is cancelable unless
//! [`WidgetEvent::with_cancelable`] or [`WidgetEvent::with_params`] says
//! otherwise.
//!
//! # Example
//!
//! ```rust
//! use serde::Serialize;
//! use tether_dom::{Document, ListenerOptions};
//! use tether_widget::WidgetEvent;
//!
//! #[derive(Serialize)]
//! struct Changed {
//!     value: i32,
//! }
//!
//! let mut doc = Document::new();
//! let slider = doc.append_element(doc.root(), "input").unwrap();
//! doc.add_event_listener(slider, "slider:change", ListenerOptions::default(), |e| {
//!     assert_eq!(e.field("value").and_then(|v| v.as_i64()), Some(42));
//! })
//! .unwrap();
//!
//! let not_canceled = WidgetEvent::new("Slider", Some(slider), "slider:change")
//!     .with_bubbles(true)
//!     .with_payload(Changed { value: 42 })
//!     .dispatch(&mut doc)
//!     .unwrap();
//! assert!(not_canceled);
//! ```

use serde::Serialize;
use serde_json::{json, Value};
use tether_dom::{Document, ElementId, Event, EventInit};

use crate::error::{WidgetError, WidgetResult};
use crate::widget::Widget;

/// Name of the field that identifies the source widget
pub const WIDGET_FIELD: &str = "widget";

/// Identity of the widget raising an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetSource {
    pub name: &'static str,
    pub element: Option<ElementId>,
}

impl WidgetSource {
    pub fn of<W: Widget>(widget: &W) -> Self {
        Self {
            name: W::NAME,
            element: widget.element(),
        }
    }

    /// Value stored in the `widget` field of the native event
    fn to_value(self) -> Value {
        json!({
            "name": self.name,
            "element": self.element.map(ElementId::to_raw),
        })
    }

    /// Read the source back from a received event
    pub fn element_of(event: &Event) -> Option<ElementId> {
        event
            .field(WIDGET_FIELD)?
            .get("element")?
            .as_u64()
            .map(ElementId::from_raw)
    }

    /// Name of the source widget of a received event
    pub fn name_of(event: &Event) -> Option<&str> {
        event.field(WIDGET_FIELD)?.get("name")?.as_str()
    }
}

/// An event raised by a widget, dispatched once on the widget's element
#[derive(Clone, Debug)]
pub struct WidgetEvent<P = ()> {
    widget: WidgetSource,
    event_type: String,
    params: EventInit,
    payload: P,
}

impl WidgetEvent<()> {
    pub fn new(
        widget_name: &'static str,
        element: Option<ElementId>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            widget: WidgetSource {
                name: widget_name,
                element,
            },
            event_type: event_type.into(),
            params: EventInit::default().with_cancelable(true),
            payload: (),
        }
    }

    pub fn from_widget<W: Widget>(widget: &W, event_type: impl Into<String>) -> Self {
        let source = WidgetSource::of(widget);
        Self::new(source.name, source.element, event_type)
    }
}

impl<P: Serialize> WidgetEvent<P> {
    /// Options for the native event, replacing both flags
    pub fn with_params(mut self, params: EventInit) -> Self {
        self.params = params;
        self
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.params.bubbles = bubbles;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.params.cancelable = cancelable;
        self
    }

    pub fn params(&self) -> EventInit {
        self.params
    }

    /// Attach the fields to copy onto the native event
    pub fn with_payload<Q: Serialize>(self, payload: Q) -> WidgetEvent<Q> {
        WidgetEvent {
            widget: self.widget,
            event_type: self.event_type,
            params: self.params,
            payload,
        }
    }

    pub fn widget(&self) -> WidgetSource {
        self.widget
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Build the native event: `widget` first, then payload fields in declaration order
    ///
    /// A payload may not declare its own `widget` field.
    pub fn create_event(&self) -> WidgetResult<Event> {
        let mut event = Event::new(self.event_type.as_str(), self.params);
        event.set_field(WIDGET_FIELD, self.widget.to_value());

        let invalid = |reason: String| WidgetError::InvalidPayload {
            event_type: self.event_type.clone(),
            reason,
        };

        match serde_json::to_value(&self.payload).map_err(|e| invalid(e.to_string()))? {
            Value::Object(fields) => {
                if fields.contains_key(WIDGET_FIELD) {
                    return Err(invalid(format!(
                        "field '{}' is reserved for the source widget",
                        WIDGET_FIELD
                    )));
                }
                for (name, value) in fields {
                    event.set_field(name, value);
                }
            }
            Value::Null => {}
            other => {
                return Err(invalid(format!("expected a struct or map, got {}", other)));
            }
        }

        Ok(event)
    }

    /// Dispatch on the source widget's element
    ///
    /// Returns `false` if a listener prevented the default action, `true`
    /// otherwise. Listener panics are not caught.
    pub fn dispatch(&self, document: &mut Document) -> WidgetResult<bool> {
        let element = self.widget.element.ok_or(WidgetError::Detached {
            widget: self.widget.name,
        })?;
        let event = self.create_event()?;

        let outcome = document.dispatch_event(element, event)?;
        tracing::trace!(
            "{} dispatched '{}' on {:?}: not_canceled={}",
            self.widget.name,
            self.event_type,
            element,
            outcome.not_canceled()
        );
        Ok(outcome.not_canceled())
    }
}

//! Sample widgets: an on/off toggle and a button that controls it
//!
//! ```html
//! <div id="wifi" data-toggle="off"></div>
//! <button data-controls="wifi"></button>
//! ```
//!
//! Listeners only see the event, never the document, so the button records
//! clicks and [`ToggleButton::apply_clicks`] acts on them afterwards.

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;
use tether_dom::{Document, ElementId, ListenerId, ListenerOptions};
use tether_widget::{
    selector_find_all, Widget, WidgetClass, WidgetControl, WidgetError, WidgetEvent, WidgetRef,
    WidgetRegistry, WidgetResult,
};

/// Event raised by a [`Toggle`] before it changes state
pub const TOGGLE_CHANGE: &str = "toggle:change";

/// Class present while a toggle is on
pub const ON_CLASS: &str = "is-on";

/// Payload of [`TOGGLE_CHANGE`]
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToggleChange {
    /// Requested state
    pub on: bool,
}

/// On/off switch bound to a `[data-toggle]` element
#[derive(Debug)]
pub struct Toggle {
    element: ElementId,
    on: bool,
}

impl Toggle {
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Request a new state
    ///
    /// Raises a cancelable, bubbling [`TOGGLE_CHANGE`] first; nothing changes
    /// if a listener prevents it. Returns whether the change was applied.
    pub fn set(&mut self, document: &mut Document, on: bool) -> WidgetResult<bool> {
        if self.on == on {
            return Ok(true);
        }

        let accepted = WidgetEvent::from_widget(&*self, TOGGLE_CHANGE)
            .with_bubbles(true)
            .with_payload(ToggleChange { on })
            .dispatch(document)?;
        if !accepted {
            tracing::debug!("toggle {:?} change to {} was canceled", self.element, on);
            return Ok(false);
        }

        self.on = on;
        self.render(document)?;
        Ok(true)
    }

    pub fn flip(&mut self, document: &mut Document) -> WidgetResult<bool> {
        self.set(document, !self.on)
    }

    fn render(&self, document: &mut Document) -> WidgetResult<()> {
        let state = if self.on { "on" } else { "off" };
        document.set_attribute(self.element, "data-toggle", state)?;
        if self.on {
            document.add_class(self.element, ON_CLASS)?;
        } else {
            document.remove_class(self.element, ON_CLASS)?;
        }
        Ok(())
    }

    fn read_state(document: &Document, element: ElementId) -> bool {
        document.attribute(element, "data-toggle") == Some("on")
    }
}

impl Widget for Toggle {
    const NAME: &'static str = "Toggle";

    fn element(&self) -> Option<ElementId> {
        Some(self.element)
    }

    fn refresh(&mut self, document: &mut Document) {
        self.on = Self::read_state(document, self.element);
        if let Err(err) = self.render(document) {
            tracing::warn!("failed to re-render toggle {:?}: {}", self.element, err);
        }
    }
}

impl WidgetClass for Toggle {
    fn find_all(document: &Document, root: ElementId) -> WidgetResult<Vec<ElementId>> {
        selector_find_all(document, root, "[data-toggle]")
    }

    fn create_instance(document: &mut Document, element: ElementId) -> WidgetResult<Self> {
        let toggle = Toggle {
            element,
            on: Self::read_state(document, element),
        };
        toggle.render(document)?;
        Ok(toggle)
    }
}

/// Button bound to `button[data-controls]`, flipping the toggle whose `id`
/// matches the attribute value
#[derive(Debug)]
pub struct ToggleButton {
    control: WidgetControl<Toggle>,
    clicks: Rc<Cell<u32>>,
    listener: Option<ListenerId>,
}

impl ToggleButton {
    pub fn target(&self) -> WidgetRef<Toggle> {
        self.control.widget
    }

    /// Clicks recorded since the last [`ToggleButton::apply_clicks`]
    pub fn pending_clicks(&self) -> u32 {
        self.clicks.get()
    }

    /// Flip the target once per recorded click
    ///
    /// Returns how many flips were applied. A target that is no longer
    /// registered consumes the clicks without effect.
    pub fn apply_clicks(
        button: ElementId,
        registry: &mut WidgetRegistry,
        document: &mut Document,
    ) -> WidgetResult<u32> {
        let Some(this) = registry.get_instance::<ToggleButton>(button) else {
            return Ok(0);
        };
        let clicks = this.clicks.replace(0);
        let target = this.target();

        let Some(toggle) = target.get_mut(registry) else {
            tracing::debug!("toggle button {:?} has no live target", button);
            return Ok(0);
        };

        let mut applied = 0;
        for _ in 0..clicks {
            if toggle.flip(document)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

impl Widget for ToggleButton {
    const NAME: &'static str = "ToggleButton";

    fn element(&self) -> Option<ElementId> {
        self.control.element
    }

    fn destroy(&mut self, document: &mut Document) {
        if let Some(listener) = self.listener.take() {
            document.remove_event_listener(listener);
        }
    }
}

impl WidgetClass for ToggleButton {
    fn find_all(document: &Document, root: ElementId) -> WidgetResult<Vec<ElementId>> {
        selector_find_all(document, root, "button[data-controls]")
    }

    fn create_instance(document: &mut Document, element: ElementId) -> WidgetResult<Self> {
        let target_id = document
            .attribute(element, "data-controls")
            .unwrap_or_default()
            .to_string();
        let target = document
            .element_by_id(&target_id)
            .ok_or_else(|| WidgetError::Construction {
                widget: Self::NAME,
                reason: format!("no element with id '{}' to control", target_id),
            })?;

        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        let listener =
            document.add_event_listener(element, "click", ListenerOptions::default(), move |_| {
                counter.set(counter.get() + 1);
            })?;

        Ok(ToggleButton {
            control: WidgetControl::new(WidgetRef::new(target), Some(element)),
            clicks,
            listener: Some(listener),
        })
    }
}

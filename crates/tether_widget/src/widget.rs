//! Widget traits
//!
//! A widget is a stateful object bound to one element. Each concrete widget
//! type implements two traits:
//!
//! - [`Widget`]: the instance side (`element`, `refresh`, `destroy`) plus a
//!   unique `NAME` used to build its registry key
//! - [`WidgetClass`]: the class side (`find_all`, `create_instance`) that
//!   [`WidgetRegistry::init_all`](crate::WidgetRegistry::init_all) and
//!   [`WidgetRegistry::delete_all`](crate::WidgetRegistry::delete_all) drive
//!
//! # Example
//!
//! ```rust
//! use tether_dom::{Document, ElementId};
//! use tether_widget::{selector_find_all, Widget, WidgetClass, WidgetResult};
//!
//! struct Tooltip {
//!     element: ElementId,
//! }
//!
//! impl Widget for Tooltip {
//!     const NAME: &'static str = "Tooltip";
//!
//!     fn element(&self) -> Option<ElementId> {
//!         Some(self.element)
//!     }
//! }
//!
//! impl WidgetClass for Tooltip {
//!     fn find_all(doc: &Document, root: ElementId) -> WidgetResult<Vec<ElementId>> {
//!         selector_find_all(doc, root, "[data-tooltip]")
//!     }
//!
//!     fn from_element(element: ElementId) -> Option<Self> {
//!         Some(Tooltip { element })
//!     }
//! }
//! ```

use std::fmt;

use tether_dom::{Document, ElementId};

use crate::error::{WidgetError, WidgetResult};

/// Instance side of a widget
pub trait Widget: 'static {
    /// Name used to build the registry key; must be unique among widget types
    const NAME: &'static str;

    /// The element this widget controls
    ///
    /// The element is owned by the document; a widget never removes it.
    fn element(&self) -> Option<ElementId>;

    /// Re-sync internal state after the document changed
    fn refresh(&mut self, _document: &mut Document) {}

    /// Detach listeners and release held resources
    fn destroy(&mut self, _document: &mut Document) {}
}

/// Class side of a widget: where it applies and how it is built
pub trait WidgetClass: Widget + Sized {
    /// Elements inside `root` this widget type applies to
    ///
    /// Every concrete widget type is expected to override this.
    fn find_all(_document: &Document, _root: ElementId) -> WidgetResult<Vec<ElementId>> {
        Err(WidgetError::NotImplemented {
            widget: Self::NAME,
            method: "find_all",
        })
    }

    /// Plain construction from an element
    ///
    /// `None` by default, for widgets that need the document to be built.
    fn from_element(_element: ElementId) -> Option<Self> {
        None
    }

    /// Build a new instance for `element`
    ///
    /// Defaults to [`WidgetClass::from_element`]. Override to attach
    /// listeners or read initial state from the document.
    fn create_instance(_document: &mut Document, element: ElementId) -> WidgetResult<Self> {
        Self::from_element(element).ok_or(WidgetError::NotImplemented {
            widget: Self::NAME,
            method: "create_instance",
        })
    }
}

/// `find_all` helper for widgets that apply to elements matching a selector
pub fn selector_find_all(
    document: &Document,
    root: ElementId,
    selector: &str,
) -> WidgetResult<Vec<ElementId>> {
    Ok(document.query_selector_all(root, selector)?)
}

/// Registry key of one widget type
///
/// Combines the type's declared name with the time the type was first used
/// by a registry. Formats as `_{name}{timestamp_ms}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    name: &'static str,
    timestamp_ms: u64,
}

impl InstanceKey {
    pub fn new(name: &'static str, timestamp_ms: u64) -> Self {
        Self { name, timestamp_ms }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}{}", self.name, self.timestamp_ms)
    }
}

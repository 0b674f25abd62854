//! Widgets that control other widgets
//!
//! A control (toggle button, slider, pager) keeps a [`WidgetRef`] to the
//! widget it drives. The reference does not own the target: it is resolved
//! through the [`WidgetRegistry`] on each use and yields `None` once the
//! target has been unregistered.

use std::fmt;
use std::marker::PhantomData;

use tether_dom::ElementId;

use crate::registry::WidgetRegistry;
use crate::widget::Widget;

/// Typed, non-owning handle to a registered widget instance
pub struct WidgetRef<W> {
    element: ElementId,
    _marker: PhantomData<fn() -> W>,
}

impl<W> Clone for WidgetRef<W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W> Copy for WidgetRef<W> {}

impl<W> PartialEq for WidgetRef<W> {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
    }
}

impl<W> Eq for WidgetRef<W> {}

impl<W: Widget> fmt::Debug for WidgetRef<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetRef<{}>({:?})", W::NAME, self.element)
    }
}

impl<W: Widget> WidgetRef<W> {
    /// Reference the `W` instance registered on `element`
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            _marker: PhantomData,
        }
    }

    /// Reference an existing widget by its element
    pub fn to(widget: &W) -> Option<Self> {
        widget.element().map(Self::new)
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn get<'a>(&self, registry: &'a WidgetRegistry) -> Option<&'a W> {
        registry.get_instance::<W>(self.element)
    }

    pub fn get_mut<'a>(&self, registry: &'a mut WidgetRegistry) -> Option<&'a mut W> {
        registry.get_instance_mut::<W>(self.element)
    }
}

/// State shared by every widget that controls a `W`
///
/// Concrete controls embed this and implement [`Widget`] on top of it.
pub struct WidgetControl<W> {
    /// Element the control itself is bound to, if any
    pub element: Option<ElementId>,
    /// The controlled widget
    pub widget: WidgetRef<W>,
}

impl<W: Widget> WidgetControl<W> {
    pub fn new(widget: WidgetRef<W>, element: Option<ElementId>) -> Self {
        Self { widget, element }
    }

    /// The controlled widget, if it is still registered
    pub fn controlled<'a>(&self, registry: &'a WidgetRegistry) -> Option<&'a W> {
        self.widget.get(registry)
    }

    pub fn controlled_mut<'a>(&self, registry: &'a mut WidgetRegistry) -> Option<&'a mut W> {
        self.widget.get_mut(registry)
    }
}

impl<W> Clone for WidgetControl<W> {
    fn clone(&self) -> Self {
        Self {
            element: self.element,
            widget: self.widget,
        }
    }
}

impl<W: Widget> fmt::Debug for WidgetControl<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetControl")
            .field("element", &self.element)
            .field("widget", &self.widget)
            .finish()
    }
}

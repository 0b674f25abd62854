//! Tether Widgets
//!
//! Binds stateful widget objects to elements of a [`tether_dom::Document`]:
//!
//! - **Widget / WidgetClass**: instance lifecycle (`refresh`, `destroy`) and
//!   class-level discovery (`find_all`, `create_instance`)
//! - **WidgetRegistry**: side-table holding at most one instance per widget
//!   type and element, with subtree `init_all` / `delete_all` passes
//! - **WidgetControl**: a widget that drives another widget
//! - **WidgetEvent**: native events carrying a typed payload
//!
//! # Example
//!
//! ```rust
//! use tether_dom::{Document, ElementId};
//! use tether_widget::{selector_find_all, Widget, WidgetClass, WidgetRegistry, WidgetResult};
//!
//! struct Accordion {
//!     element: ElementId,
//!     refreshes: u32,
//! }
//!
//! impl Widget for Accordion {
//!     const NAME: &'static str = "Accordion";
//!
//!     fn element(&self) -> Option<ElementId> {
//!         Some(self.element)
//!     }
//!
//!     fn refresh(&mut self, _document: &mut Document) {
//!         self.refreshes += 1;
//!     }
//! }
//!
//! impl WidgetClass for Accordion {
//!     fn find_all(doc: &Document, root: ElementId) -> WidgetResult<Vec<ElementId>> {
//!         selector_find_all(doc, root, ".accordion")
//!     }
//!
//!     fn from_element(element: ElementId) -> Option<Self> {
//!         Some(Accordion { element, refreshes: 0 })
//!     }
//! }
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let el = doc.append_element(root, "section").unwrap();
//! doc.add_class(el, "accordion").unwrap();
//!
//! let mut registry = WidgetRegistry::new();
//! registry.init_all::<Accordion>(&mut doc, root).unwrap();
//! registry.init_all::<Accordion>(&mut doc, root).unwrap();
//! assert_eq!(registry.get_instance::<Accordion>(el).unwrap().refreshes, 1);
//!
//! registry.delete_all::<Accordion>(&mut doc, root).unwrap();
//! assert!(registry.get_instance::<Accordion>(el).is_none());
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod registry;
pub mod widget;

pub use config::RegistryConfig;
pub use control::{WidgetControl, WidgetRef};
pub use error::{WidgetError, WidgetResult};
pub use event::{WidgetEvent, WidgetSource, WIDGET_FIELD};
pub use registry::{Clock, InitReport, WidgetRegistry};
pub use widget::{selector_find_all, InstanceKey, Widget, WidgetClass};

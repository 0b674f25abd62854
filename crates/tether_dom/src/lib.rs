//! Tether DOM
//!
//! The element tree that Tether widgets attach to:
//!
//! - **Document**: generational element handles, attributes, classes, subtree traversal
//! - **Selectors**: simple compound selectors for subtree queries
//! - **Events**: native events with capture/target/bubble dispatch and cancelation
//!
//! # Example
//!
//! ```rust
//! use tether_dom::Document;
//!
//! let mut doc = Document::new();
//! let panel = doc.append_element(doc.root(), "div").unwrap();
//! doc.set_attribute(panel, "data-toggle", "off").unwrap();
//!
//! let found = doc.query_selector_all(doc.root(), "[data-toggle]").unwrap();
//! assert_eq!(found, vec![panel]);
//! ```

pub mod document;
pub mod error;
pub mod event;
pub mod selector;

pub use document::{Document, ElementId};
pub use error::{DomError, DomResult};
pub use event::{
    DispatchOutcome, Event, EventCallback, EventInit, EventPhase, ListenerId, ListenerOptions,
};
pub use selector::Selector;

// Event field values are plain JSON values
pub use serde_json::Value;

//! Error types for tether_dom

use thiserror::Error;

use crate::document::ElementId;

/// Errors produced by element tree operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The element handle is stale or never existed
    #[error("Element {0:?} does not exist in this document")]
    ElementNotFound(ElementId),

    /// The document root can't be detached or removed
    #[error("The document root cannot be removed")]
    CannotRemoveRoot,

    /// Appending would make an element its own ancestor
    #[error("Cannot append {child:?} to {parent:?}: the new parent is inside the child")]
    HierarchyCycle { parent: ElementId, child: ElementId },

    /// Selector text could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Result type for tether_dom operations
pub type DomResult<T> = std::result::Result<T, DomError>;

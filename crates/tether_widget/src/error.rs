//! Error types for tether_widget

use std::path::PathBuf;

use tether_dom::DomError;
use thiserror::Error;

/// Errors that can occur while managing widgets
#[derive(Error, Debug)]
pub enum WidgetError {
    /// A widget type relies on a class-level method it never provided
    #[error("Method '{method}' is not implemented for widget '{widget}'")]
    NotImplemented {
        widget: &'static str,
        method: &'static str,
    },

    /// Two distinct widget types declared the same name
    #[error("Widget name '{name}' is declared by more than one widget type")]
    DuplicateName { name: &'static str },

    /// `create_instance` could not build the widget from the document
    #[error("Cannot create widget '{widget}': {reason}")]
    Construction { widget: &'static str, reason: String },

    /// The widget has no element to dispatch on
    #[error("Widget '{widget}' is not attached to an element")]
    Detached { widget: &'static str },

    /// An event payload did not serialize to a set of named fields
    #[error("Payload for event '{event_type}' must serialize to named fields: {reason}")]
    InvalidPayload { event_type: String, reason: String },

    /// Failed to read a configuration file
    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Element tree error
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Result type for tether_widget operations
pub type WidgetResult<T> = std::result::Result<T, WidgetError>;

//! Tether Demo
//!
//! Sample widgets built on `tether_widget`, used by the `tether-demo`
//! binary to walk through discovery, refresh, controls, cancelable widget
//! events, and teardown.

pub mod widgets;

pub use widgets::{Toggle, ToggleButton, ToggleChange, ON_CLASS, TOGGLE_CHANGE};

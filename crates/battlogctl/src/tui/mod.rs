//! TUI Module
//!
//! - app: state and event dispatch
//! - event_loop: terminal setup, timer and input tasks
//! - input: key and mouse bindings
//! - layout: panel rectangles
//! - render: frame drawing
//! - surface: braille chart surface over a ratatui buffer

pub mod app;
mod event_loop;
pub mod input;
pub mod layout;
pub mod render;
pub mod surface;

pub use app::{Action, App, AppEvent};
pub use event_loop::run;

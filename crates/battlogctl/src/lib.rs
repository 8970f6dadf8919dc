//! battlogctl - viewer for the battlog CSV log
//!
//! Exposes the command implementations and the TUI so integration tests can
//! drive them without a terminal.

pub mod commands;
pub mod tui;

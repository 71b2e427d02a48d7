//! Presentation layer handling terminal UI and user input.
//!
//! This module manages the terminal user interface using ratatui,
//! handles keyboard input, and renders the task board.

pub mod input;
pub mod palette;
pub mod ui;

pub use input::*;
pub use palette::*;
pub use ui::*;

//! Line-oriented terminal front end.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and command dispatch
//! - `commands` - Input line parsing
//! - `render` - Plain-text tabs, topic list and status

mod commands;
mod loop_runner;
mod render;

pub use commands::{parse, Command, CommandError};
pub use loop_runner::{run, Action};
pub use render::{render_status, render_tabs, render_topics};

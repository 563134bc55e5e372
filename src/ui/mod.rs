//! Terminal User Interface.
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `render` - Layout, feed list and sentinel measurement
//! - `posts` - Post card lines and relative timestamps
//! - `status` - Status bar widget
//! - `helpers` - Background fetch dispatch and link opening

mod helpers;
mod input;
mod loop_runner;
mod posts;
mod render;
mod status;

pub use loop_runner::{run, Action};
pub use posts::format_relative_time;

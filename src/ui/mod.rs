//! Terminal front end for the notification bell.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard and mouse handling
//! - `render` - Bell, dropdown panel and hint bar
//! - `state` - Selection and hit-test regions
//! - `browser` - `Navigator` that opens links in the system browser

mod browser;
mod input;
mod loop_runner;
mod render;
mod state;

pub use browser::BrowserNavigator;
pub use loop_runner::{run, Action};

//! Display and navigation helpers for the notification widget.
//!
//! - **Text**: Unicode-aware width and truncation, and sanitizing
//!   server-provided strings before they reach the terminal
//! - **Time**: relative timestamps (`"5m ago"`)
//! - **URL validation**: resolving a notification's `actionUrl` into a
//!   link that is safe to open
//!
//! ```
//! use bellwire::util::{display_width, truncate_to_width};
//!
//! assert_eq!(display_width("Offer 🎉"), 8);
//! assert_eq!(truncate_to_width("Application received", 10), "Applica...");
//! ```

mod text;
mod time;
mod url_validator;

pub use text::{display_width, single_line, strip_control_chars, truncate_to_width};
pub use time::relative_time;
pub use url_validator::{resolve_action_url, UrlValidationError};

//! Utility functions for common operations.
//!
//! - **URL validation**: shape checks for the configured forum base URL
//! - **Text processing**: terminal-safe, width-aware rendering of topic titles

mod text;
mod url_validator;

pub use text::{display_width, fit_to_width, sanitize_line, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};

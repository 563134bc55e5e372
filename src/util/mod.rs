//! Shared helpers.
//!
//! - **URL validation**: base URL for the API, attachment links before opening
//! - **Text processing**: width-aware truncation and wrapping, control character stripping

mod text;
mod url_validator;

pub use text::{display_width, strip_control_chars, truncate_to_width, wrap_to_width};
pub use url_validator::{validate_base_url, validate_url_for_open, UrlValidationError};

/// Maximum search query length in characters; longer input is cut.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;

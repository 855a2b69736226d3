//! Key validation.
//!
//! Keys end up as file names in [`LocalBackend`](crate::backend::LocalBackend),
//! so the accepted alphabet is narrow: nothing that could be
//! read as a path separator, a parent reference or a hidden file.

use crate::error::{ErrorKind, Result};

/// Longest key accepted, in bytes. Well under any filesystem name limit.
const MAX_KEY_LEN: usize = 200;

/// Validates a storage key.
///
/// Accepts ASCII alphanumerics plus `.`, `_`, `-` and `:`. Keys must be
/// non-empty, at most 200 bytes, and must not start with a `.`.
///
/// # Returns
/// Returns the key (owned) if valid, or [`InvalidKey`](crate::error::ErrorKind::InvalidKey)
/// if not.
///
/// # Examples
///
/// ```
/// use showreel_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("showreel.prefetch.v1").is_ok());
/// assert!(validate_key("preloadedVideos").is_ok());
/// // Invalid keys
/// assert!(validate_key("../escape").is_err());
/// assert!(validate_key(".hidden").is_err());
/// assert!(validate_key("with space").is_err());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let key = key.as_ref();
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':');
    if key.is_empty() || key.len() > MAX_KEY_LEN || key.starts_with('.') || !key.chars().all(allowed) {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    Ok(key.to_string())
}

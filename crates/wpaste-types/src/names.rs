//! Entry name validation.
//!
//! Generated names are drawn from [`NAME_ALPHABET`]. Caller-chosen names are
//! a little more permissive:
//! - Must be non-empty and at most [`MAX_NAME_LEN`] characters
//! - Must contain only ASCII letters, digits, `_`, `-` and `.`
//! - Must not be `.` or `..`

use crate::error::TypeError;

/// Alphabet used for generated names: 62 case-sensitive symbols.
pub const NAME_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Longest name a caller may request.
pub const MAX_NAME_LEN: usize = 64;

/// Punctuation allowed in caller-chosen names on top of the alphabet.
const EXTRA_CHARS: &[char] = &['_', '-', '.'];

/// Validate a caller-chosen entry name, returning `Ok(())` if valid.
///
/// Names end up as a single URL path segment, so anything that would need
/// escaping or could be read as a relative path is refused.
///
/// # Examples
///
/// ```
/// use wpaste_types::validate_entry_name;
///
/// assert!(validate_entry_name("hello_world").is_ok());
/// assert!(validate_entry_name("").is_err());
/// assert!(validate_entry_name("a/b").is_err());
/// ```
pub fn validate_entry_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            name,
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || EXTRA_CHARS.contains(c)))
    {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }

    if name == "." || name == ".." {
        return Err(invalid(name, "name must not be '.' or '..'"));
    }

    Ok(())
}

fn invalid(name: &str, reason: impl Into<String>) -> TypeError {
    TypeError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

//! # Handle Normalization
//!
//! Handles are compared in a canonical form: ASCII uppercase is folded to
//! lowercase, `[a-z0-9_-]` passes through, and anything else is rejected.
//! Every lookup and every store goes through [`normalize`], so two raw
//! inputs that normalize identically are the same registry entry.

use tipjar_protocol::config::MAX_NAME_LENGTH;

use super::error::RegistryError;

/// Produces the canonical form of a raw handle.
///
/// Length is checked first (empty, then over [`MAX_NAME_LENGTH`] bytes),
/// then every byte is checked against the allowed set. Non-ASCII input is
/// rejected byte-wise, so a multi-byte character fails on its first byte.
///
/// # Errors
///
/// [`RegistryError::NameTooShort`], [`RegistryError::NameTooLong`] or
/// [`RegistryError::InvalidName`].
pub fn normalize(raw: &str) -> Result<String, RegistryError> {
    let bytes = raw.as_bytes();
    if bytes.is_empty() {
        return Err(RegistryError::NameTooShort);
    }
    if bytes.len() > MAX_NAME_LENGTH {
        return Err(RegistryError::NameTooLong {
            len: bytes.len(),
            max: MAX_NAME_LENGTH,
        });
    }

    let mut out = String::with_capacity(bytes.len());
    for (position, &byte) in bytes.iter().enumerate() {
        match byte {
            b'A'..=b'Z' => out.push(byte.to_ascii_lowercase() as char),
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => out.push(byte as char),
            _ => return Err(RegistryError::InvalidName { byte, position }),
        }
    }
    Ok(out)
}

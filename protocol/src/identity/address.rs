//! # Addresses
//!
//! An [`Address`] identifies any party that can hold or receive native
//! value: handle controllers, tippers, the fee sink, the registry owner.
//! It is 20 opaque bytes, rendered as `0x`-prefixed lowercase hex.
//!
//! The all-zero address is the *null address*. It never controls a handle,
//! never receives fees, and is used by read operations to mean "nobody".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing an address string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded data has an unexpected length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address.
///
/// # Examples
///
/// ```
/// use tipjar_protocol::identity::Address;
///
/// let alice = Address::derive("alice");
/// let parsed: Address = alice.to_string().parse().unwrap();
/// assert_eq!(alice, parsed);
/// assert!(!alice.is_zero());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw address bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives a deterministic address from a label: the first 20 bytes of
    /// `BLAKE3(label)`. Handy for fixtures, genesis files, and replay tools
    /// where parties are named rather than keyed.
    pub fn derive(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for the null address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: ADDRESS_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self(bytes))
    }
}

// Hex strings on the wire so addresses work as JSON map keys.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::derive("x").is_zero());
    }

    #[test]
    fn derive_is_deterministic_and_distinct() {
        assert_eq!(Address::derive("alice"), Address::derive("alice"));
        assert_ne!(Address::derive("alice"), Address::derive("bob"));
    }

    #[test]
    fn display_is_prefixed_hex() {
        let s = Address::from_bytes([0xab; ADDRESS_LENGTH]).to_string();
        assert_eq!(s.len(), 2 + ADDRESS_LENGTH * 2);
        assert!(s.starts_with("0xabab"));
    }

    #[test]
    fn parse_accepts_unprefixed_hex() {
        let addr = Address::derive("carol");
        let unprefixed = hex::encode(addr.as_bytes());
        assert_eq!(unprefixed.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressError::InvalidHex(_))
        ));
        assert_eq!(
            "0xabcd".parse::<Address>(),
            Err(AddressError::InvalidLength {
                expected: ADDRESS_LENGTH,
                got: 2
            })
        );
    }

    #[test]
    fn serde_json_map_keys() {
        let mut map = HashMap::new();
        map.insert(Address::derive("k"), 7u32);
        let json = serde_json::to_string(&map).unwrap();
        let back: HashMap<Address, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}

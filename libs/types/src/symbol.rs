//! Packed symbol identifiers
//!
//! Symbols are at most 8 ASCII bytes packed into a single u64 so that
//! equality and hashing on the matching hot path are plain integer
//! operations. The first character occupies the most significant byte;
//! unused trailing positions are zero.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire size of a symbol in bytes.
pub const SYMBOL_SIZE: usize = 8;

/// Replacement byte for non-ASCII input characters.
const REPLACEMENT: u8 = b'?';

/// A trading symbol packed into a u64.
///
/// Two symbols are equal iff their packed forms are equal. Symbols longer
/// than eight bytes are truncated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u64);

impl Symbol {
    /// Sentinel for an unresolvable symbol, e.g. a cancel for an unknown
    /// order. Packs to zero and displays as `<UNK>`.
    pub const UNKNOWN: Symbol = Symbol(0);

    /// Pack a string into a symbol.
    ///
    /// Input is truncated to eight bytes; non-ASCII bytes are replaced
    /// with `?`. An empty string yields [`Symbol::UNKNOWN`].
    pub fn new(s: &str) -> Self {
        let mut packed: u64 = 0;
        for (i, b) in s.bytes().take(SYMBOL_SIZE).enumerate() {
            let b = if b.is_ascii() && b != 0 { b } else { REPLACEMENT };
            packed |= (b as u64) << (56 - i * 8);
        }
        Symbol(packed)
    }

    /// Reconstruct a symbol from its packed form.
    pub fn from_packed(packed: u64) -> Self {
        Symbol(packed)
    }

    /// Get the packed integer form.
    pub fn packed(&self) -> u64 {
        self.0
    }

    /// Whether this is the unknown sentinel.
    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }

    /// Decode from a fixed 8-byte wire field (big-endian, zero-padded).
    pub fn from_wire(bytes: [u8; SYMBOL_SIZE]) -> Self {
        Symbol(u64::from_be_bytes(bytes))
    }

    /// Encode to a fixed 8-byte wire field (big-endian, zero-padded).
    pub fn to_wire(&self) -> [u8; SYMBOL_SIZE] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "<UNK>");
        }
        for b in self.0.to_be_bytes() {
            if b == 0 {
                break;
            }
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

// Serialized as the display string so logs and JSON exports stay readable.
impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "<UNK>" {
            Ok(Symbol::UNKNOWN)
        } else {
            Ok(Symbol::new(&s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_first_char_in_msb() {
        let sym = Symbol::new("IBM");
        let bytes = sym.to_wire();
        assert_eq!(&bytes[..3], b"IBM");
        assert_eq!(&bytes[3..], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_equality_is_packed_equality() {
        assert_eq!(Symbol::new("AAPL"), Symbol::new("AAPL"));
        assert_ne!(Symbol::new("AAPL"), Symbol::new("AAPl"));
        assert_eq!(
            Symbol::new("AAPL").packed(),
            Symbol::from_packed(Symbol::new("AAPL").packed()).packed()
        );
    }

    #[test]
    fn test_truncation_at_eight_bytes() {
        assert_eq!(Symbol::new("ABCDEFGHIJ"), Symbol::new("ABCDEFGH"));
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(Symbol::new("Ä").to_string(), "??");
    }

    #[test]
    fn test_empty_is_unknown() {
        assert!(Symbol::new("").is_unknown());
        assert_eq!(Symbol::new("").to_string(), "<UNK>");
    }

    #[test]
    fn test_wire_round_trip() {
        let sym = Symbol::new("MSFT");
        assert_eq!(Symbol::from_wire(sym.to_wire()), sym);
    }

    #[test]
    fn test_display() {
        assert_eq!(Symbol::new("TSLA").to_string(), "TSLA");
        assert_eq!(Symbol::UNKNOWN.to_string(), "<UNK>");
    }

    #[test]
    fn test_serde_round_trip() {
        let sym = Symbol::new("GOOG");
        let json = serde_json::to_string(&sym).unwrap();
        assert_eq!(json, "\"GOOG\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sym);
    }
}

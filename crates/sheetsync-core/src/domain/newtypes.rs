//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for sheet identities and
//! content hashes. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// SheetName
// ============================================================================

/// Name of a sheet in the remote document
///
/// A sheet name is the identity of a sheet (unique per remote document).
/// Names are validated so they can be embedded in A1 range notation:
/// - Non-empty, at most [`SheetName::MAX_LEN`] characters
/// - No leading/trailing whitespace
/// - None of `! ' [ ] * ? / \ :`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SheetName(String);

impl SheetName {
    /// Maximum sheet title length accepted by the remote service
    pub const MAX_LEN: usize = 100;

    /// Characters that cannot appear in a sheet title
    const FORBIDDEN: &'static [char] = &['!', '\'', '[', ']', '*', '?', '/', '\\', ':'];

    /// Sheet holding item definitions
    pub const OBJECTS: &'static str = "objects";

    /// Sheet holding transactions
    pub const STATS: &'static str = "stats";

    /// Create a new SheetName
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSheetName` if the name is empty, too long,
    /// padded with whitespace, or contains a forbidden character
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if name.is_empty() {
            return Err(DomainError::InvalidSheetName(
                "Sheet name cannot be empty".to_string(),
            ));
        }

        if name.chars().count() > Self::MAX_LEN {
            return Err(DomainError::InvalidSheetName(format!(
                "Sheet name exceeds {} characters: {name}",
                Self::MAX_LEN
            )));
        }

        if name.trim() != name {
            return Err(DomainError::InvalidSheetName(format!(
                "Sheet name has surrounding whitespace: {name:?}"
            )));
        }

        if name.contains(Self::FORBIDDEN) {
            return Err(DomainError::InvalidSheetName(name));
        }

        Ok(Self(name))
    }

    /// The item definitions sheet (`"objects"`)
    #[must_use]
    pub fn objects() -> Self {
        Self(Self::OBJECTS.to_string())
    }

    /// The transactions sheet (`"stats"`)
    #[must_use]
    pub fn stats() -> Self {
        Self(Self::STATS.to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SheetName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SheetName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SheetName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SheetName> for String {
    fn from(name: SheetName) -> Self {
        name.0
    }
}

// ============================================================================
// ContentHash
// ============================================================================

/// SHA-256 digest of a grid's canonical serialization, lowercase hex
///
/// Produced by [`crate::codec::hash`]. Two grids with identical cells in
/// identical order always hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Hex length of a SHA-256 digest
    const HEX_LEN: usize = 64;

    /// Create a ContentHash from its hex representation
    ///
    /// # Errors
    /// Returns error if the string is not 64 lowercase hex characters
    pub fn new(hex: String) -> Result<Self, DomainError> {
        if hex.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidHash(format!(
                "Hash has wrong length: expected {} hex chars, got {}",
                Self::HEX_LEN,
                hex.len()
            )));
        }

        if !hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidHash(format!(
                "Hash is not lowercase hex: {hex}"
            )));
        }

        Ok(Self(hex))
    }

    /// Build a ContentHash from raw digest bytes
    pub(crate) fn from_digest(bytes: &[u8]) -> Self {
        let mut hex = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod sheet_name_tests {
        use super::*;

        #[test]
        fn test_valid_names() {
            assert!(SheetName::new("objects").is_ok());
            assert!(SheetName::new("Stats 2026").is_ok());
            assert!(SheetName::new("Inventário").is_ok());
        }

        #[test]
        fn test_empty_rejected() {
            assert!(matches!(
                SheetName::new(""),
                Err(DomainError::InvalidSheetName(_))
            ));
        }

        #[test]
        fn test_forbidden_characters_rejected() {
            for bad in ["a!b", "it's", "x[1]", "a/b", "a:b", "why?"] {
                assert!(SheetName::new(bad).is_err(), "{bad} should be rejected");
            }
        }

        #[test]
        fn test_whitespace_padding_rejected() {
            assert!(SheetName::new(" objects").is_err());
            assert!(SheetName::new("objects ").is_err());
        }

        #[test]
        fn test_too_long_rejected() {
            let long = "x".repeat(SheetName::MAX_LEN + 1);
            assert!(SheetName::new(long).is_err());
            let max = "x".repeat(SheetName::MAX_LEN);
            assert!(SheetName::new(max).is_ok());
        }

        #[test]
        fn test_well_known_names() {
            assert_eq!(SheetName::objects().as_str(), "objects");
            assert_eq!(SheetName::stats().as_str(), "stats");
        }

        #[test]
        fn test_serde_roundtrip() {
            let name = SheetName::objects();
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, "\"objects\"");
            let back: SheetName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, name);
        }

        #[test]
        fn test_serde_rejects_invalid() {
            let result: Result<SheetName, _> = serde_json::from_str("\"a!b\"");
            assert!(result.is_err());
        }
    }

    mod content_hash_tests {
        use super::*;

        #[test]
        fn test_from_digest_is_lowercase_hex() {
            let hash = ContentHash::from_digest(&[0xAB, 0x01, 0xFF]);
            assert_eq!(hash.as_str(), "ab01ff");
        }

        #[test]
        fn test_parse_valid() {
            let hex = "0".repeat(64);
            let hash: ContentHash = hex.parse().unwrap();
            assert_eq!(hash.as_str(), hex);
            assert_eq!(hash.short(), "000000000000");
        }

        #[test]
        fn test_parse_rejects_wrong_length() {
            assert!("abc".parse::<ContentHash>().is_err());
        }

        #[test]
        fn test_parse_rejects_uppercase() {
            let hex = "A".repeat(64);
            assert!(hex.parse::<ContentHash>().is_err());
        }
    }
}

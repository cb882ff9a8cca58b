//! Internal implementation of record identifiers.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Klinik's canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to render in canonical form.
///
/// # Construction
/// - [`RecordId::new`] issues a fresh random identifier for a new record.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// Issues a globally unique identifier for a new record.
///
/// Identifiers are random (UUID v4) and carry no ordering; queue and order numbers come from
/// the sequence issuer instead.
pub fn issue_identifier() -> RecordId {
    RecordId::new()
}

impl RecordId {
    /// Generates a new identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not exactly 32 lowercase hex
    /// characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "record id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes, each one of `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

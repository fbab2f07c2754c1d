use crate::error::InvalidInput;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Upper bound (inclusive) for a subject identifier.
pub const MAX_USER_ID: u64 = 1_000_000_000;

const MAX_REDIRECT_ID_LENGTH: usize = 64;

/// A verified subject identifier in `1..=10^9`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct UserId(u64);

impl UserId {
    /// Creates a `UserId` after checking the allowed range.
    pub fn new(value: u64) -> Result<Self, InvalidInput> {
        if value == 0 || value > MAX_USER_ID {
            return Err(InvalidInput);
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for UserId {
    type Error = InvalidInput;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for u64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier correlating one gateway round-trip with its [`RedirectRecord`].
///
/// Generated identifiers are random UUID v4 bytes encoded as base58.
///
/// [`RedirectRecord`]: crate::record::RedirectRecord
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedirectId(String);

impl RedirectId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        Self(bs58::encode(bytes).into_string())
    }

    /// Parses an identifier supplied by a client.
    ///
    /// Valid identifiers are 1-64 characters of `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        if raw.is_empty() || raw.len() > MAX_REDIRECT_ID_LENGTH {
            return Err(InvalidInput);
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidInput);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Creates a `RedirectId` without validation.
    ///
    /// Use this only for identifiers read back from the store.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RedirectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

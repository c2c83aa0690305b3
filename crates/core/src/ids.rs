//! Record identifiers and sharded-path utilities.
//!
//! Every stored document (referral, user, service) is keyed by a [`RecordId`]: a UUIDv4 in
//! canonical form, **32 lowercase hexadecimal characters** with no hyphens.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, the JSON file store keeps the document under:
//! `collection_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `referral_data/referrals/55/0e/550e8400e29b41d4a716446655440000/`

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Canonical identifier for a stored document.
///
/// Once constructed, the contained UUID is guaranteed to render in canonical form.
/// Externally supplied identifiers (path segments, query strings, CLI arguments) go through
/// [`RecordId::parse`], which rejects hyphenated or uppercase spellings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Allocates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> CoreResult<Self> {
        if Self::is_canonical(input) {
            let uuid = Uuid::parse_str(input).map_err(|e| CoreError::Validation(e.to_string()))?;
            return Ok(Self(uuid));
        }
        Err(CoreError::Validation(format!(
            "identifier must be 32 lowercase hex characters without hyphens, got: '{input}'"
        )))
    }

    /// Returns true if `input` is a canonical identifier.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first two hex pairs.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

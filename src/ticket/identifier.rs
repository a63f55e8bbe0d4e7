//! Normalized ticket identifier

use serde::{Deserialize, Serialize};

/// A ticket identifier in canonical `PREFIX-DIGITS` form
///
/// Only constructed through [`Identifier::normalize`], so two raw matches
/// that differ in case or spacing compare equal once normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Normalize a raw match such as `ecp 4805` or `ECP - 4805`
    ///
    /// Accepts a run of ASCII letters, any mix of whitespace and dashes, then
    /// one or more ASCII digits. Anything else is rejected.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let prefix_len = trimmed
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        if prefix_len == 0 {
            return None;
        }
        let (prefix, rest) = trimmed.split_at(prefix_len);
        let digits = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-');
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self(format!("{}-{}", prefix.to_ascii_uppercase(), digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project prefix, e.g. `ECP`
    pub fn prefix(&self) -> &str {
        self.0.split_once('-').map(|(p, _)| p).unwrap_or(&self.0)
    }

    /// Numeric suffix as written, e.g. `4805`
    pub fn number(&self) -> &str {
        self.0.split_once('-').map(|(_, n)| n).unwrap_or("")
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value).ok_or_else(|| format!("not a ticket identifier: {:?}", value))
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

//! Session token correlating outbound embed requests with inbound messages.
//!
//! Tokens come from UUID v4 rendered without hyphens. They only need to be
//! unique per page session; they are not a security boundary.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Per-instance random identifier carried as `unique_token` in frame messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a fresh token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parses a token received from elsewhere (tests, persisted state).
    ///
    /// Tokens are non-empty and ASCII alphanumeric so they can be embedded
    /// in element ids and attributes without escaping.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidToken("empty token".into()));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidToken(format!("unexpected characters in '{s}'")));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `candidate` is exactly this token.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    /// Element id of the overlay container owned by this session.
    #[must_use]
    pub fn holder_id(&self) -> String {
        format!("csvbox-embed-{}", self.0)
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

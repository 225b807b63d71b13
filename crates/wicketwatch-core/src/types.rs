//! Shared types used across the Wicketwatch crates.
//!
//! Defines the identifier newtype and the match-kind enum that drive
//! worker lifecycle and extraction strategy selection.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for match identifiers.
///
/// A match identifier is the absolute URL of the live match page on the
/// source site. It is the unique key in the persisted store, the worker
/// registry and every delivered payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Create a new `MatchId` from a string.
    ///
    /// # Errors
    /// Returns error if the identifier is empty or whitespace-only.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::Validation(
                "match identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The extraction variant for this match, decided from the URL.
    #[must_use]
    pub fn kind(&self) -> MatchKind {
        MatchKind::from_url(&self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Match format variant, selected once per identifier.
///
/// The source site lays out the odds block differently for test matches
/// than for limited-overs formats, so the worker picks its odds
/// extraction strategy from this enum at start rather than re-inspecting
/// the URL every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Multi-day test match: odds rendered as one row per team.
    Test,
    /// Limited-overs match: single favourite-team row plus session odds.
    LimitedOvers,
}

impl MatchKind {
    /// Classify a match page URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        if url.contains("test") {
            Self::Test
        } else {
            Self::LimitedOvers
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::LimitedOvers => write!(f, "limited-overs"),
        }
    }
}

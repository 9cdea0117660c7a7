//! Shared types used across the Stockroom pipeline.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::{Result, StockroomError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Identifier of an asset at the upstream stock source.
///
/// Parsed from the local file name and used both as the lookup key for the
/// source's detail page and as the sole deduplication key of the completion log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepositId(String);

impl DepositId {
    /// Create a new `DepositId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace or path separators.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<()> {
        static DEPOSIT_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = DEPOSIT_REGEX.get_or_init(|| Regex::new(r"^[^\s/\\]+$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(StockroomError::Validation(format!(
                "invalid deposit ID: must be non-empty without whitespace or path separators, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the remote gallery after a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wrap a gallery-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named phase of the per-asset pipeline, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Size gate and alt-text generation
    AltText,
    /// Reading the detail page heading
    Title,
    /// Reading the author badge
    Author,
    /// Rendering and reading the keyword list
    Keywords,
    /// Uploading to the remote gallery
    Publish,
}

impl Stage {
    /// Label written to the failure log.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AltText => "Generating Alt Text",
            Self::Title => "Gathering Title",
            Self::Author => "Gathering Author",
            Self::Keywords => "Gathering Keywords",
            Self::Publish => "Piwigo addSimple",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

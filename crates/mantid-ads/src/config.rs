//! Data service configuration
//!
//! ```toml
//! illegal_characters = " +-*/%<>&|^~=!@()[]{},:.`$#\"'?;\\"
//! show_hidden = false
//! unique_name_attempts_per_char = 260
//! ```

use crate::error::AdsError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of an [`AnalysisDataService`](crate::AnalysisDataService)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    /// Characters that may not appear in workspace names
    pub illegal_characters: String,
    /// Whether `__`-prefixed workspaces appear in default listings
    pub show_hidden: bool,
    /// Unique name attempts allowed per character of random body
    pub unique_name_attempts_per_char: usize,
}

impl AdsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With illegal name characters
    #[inline]
    #[must_use]
    pub fn with_illegal_characters(mut self, chars: impl Into<String>) -> Self {
        self.illegal_characters = chars.into();
        self
    }

    /// With hidden workspaces listed by default
    #[inline]
    #[must_use]
    pub fn with_show_hidden(mut self, show: bool) -> Self {
        self.show_hidden = show;
        self
    }

    /// With a unique name attempt budget
    #[inline]
    #[must_use]
    pub fn with_unique_name_attempts_per_char(mut self, attempts: usize) -> Self {
        self.unique_name_attempts_per_char = attempts;
        self
    }

    /// Parse TOML text; missing keys keep their defaults
    ///
    /// # Errors
    /// [`AdsError::Config`]
    pub fn from_toml_str(text: &str) -> Result<Self, AdsError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// [`AdsError::Io`] or [`AdsError::Config`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AdsError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "data service configuration loaded");
        Ok(config)
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            illegal_characters: String::new(),
            show_hidden: false,
            unique_name_attempts_per_char: 260,
        }
    }
}

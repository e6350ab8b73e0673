//! Recorded property values
//!
//! Provides [`PropertyHistory`], the value an algorithm property held when
//! the algorithm ran, and its [`Direction`].

use crate::error::RecordParseError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Data flow direction of an algorithm property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Read by the algorithm
    #[default]
    Input,
    /// Written by the algorithm
    Output,
    /// Read and written
    InOut,
    /// Not applicable
    None,
}

impl Direction {
    /// Text used in persisted records
    #[inline]
    #[must_use]
    pub fn as_text(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::InOut => "InOut",
            Self::None => "N/A",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

impl FromStr for Direction {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Input" => Ok(Self::Input),
            "Output" => Ok(Self::Output),
            "InOut" => Ok(Self::InOut),
            "N/A" | "None" => Ok(Self::None),
            other => Err(RecordParseError::UnknownDirection(other.to_string())),
        }
    }
}

/// Value of one algorithm property at execution time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyHistory {
    name: String,
    value: String,
    type_name: String,
    is_default: bool,
    direction: Direction,
}

impl PropertyHistory {
    /// Record a property value
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        type_name: impl Into<String>,
        is_default: bool,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            type_name: type_name.into(),
            is_default,
            direction,
        }
    }

    /// Property name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value as a string
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Type name reported by the algorithm; empty when loaded from text
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether the value was left at its default
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Property direction
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Display for PropertyHistory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Value: {}, Default?: {}, Direction: {}",
            self.name,
            self.value,
            if self.is_default { "Yes" } else { "No" },
            self.direction
        )
    }
}

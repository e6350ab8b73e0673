//! Hierarchical container for persisted histories
//!
//! Provides [`NexusGroup`], an in-memory tree of classed groups and text
//! fields shaped like a NeXus file, and [`NexusFile`], which stores such a
//! tree on disk as JSON.

use crate::error::HistoryError;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Class given to the root group of a new file
pub const ROOT_CLASS: &str = "NXroot";

/// Text dataset with attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusField {
    /// Field contents
    pub value: String,
    /// Attributes attached to the field
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
}

impl NexusField {
    /// Attach or overwrite an attribute
    pub fn put_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Read an attribute
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Group node holding fields and nested groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusGroup {
    /// NeXus class name, e.g. `NXprocess`
    pub class: String,
    /// Datasets in insertion order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, NexusField>,
    /// Sub-groups in insertion order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<String, NexusGroup>,
}

impl NexusGroup {
    /// Create an empty group of `class`
    #[inline]
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    /// Create (or reset) the sub-group `name` and return it
    pub fn make_group(&mut self, name: impl Into<String>, class: impl Into<String>) -> &mut NexusGroup {
        let fresh = NexusGroup::new(class);
        match self.groups.entry(name.into()) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                *slot = fresh;
                slot
            }
            Entry::Vacant(entry) => entry.insert(fresh),
        }
    }

    /// Open the sub-group `name`
    #[must_use]
    pub fn open_group(&self, name: &str) -> Option<&NexusGroup> {
        self.groups.get(name)
    }

    /// Open the sub-group `name` only if it has `class`
    #[must_use]
    pub fn open_group_with_class(&self, name: &str, class: &str) -> Option<&NexusGroup> {
        self.groups.get(name).filter(|g| g.class == class)
    }

    /// Write the text dataset `name`, replacing any previous value
    pub fn write_data(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut NexusField {
        let field = NexusField {
            value: value.into(),
            attributes: IndexMap::new(),
        };
        match self.fields.entry(name.into()) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                *slot = field;
                slot
            }
            Entry::Vacant(entry) => entry.insert(field),
        }
    }

    /// Read the text dataset `name`
    #[must_use]
    pub fn read_data(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.value.as_str())
    }

    /// Dataset `name` with its attributes
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&NexusField> {
        self.fields.get(name)
    }

    /// All direct entries as `(name, class)`; datasets report class `SDS`
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.groups
            .iter()
            .map(|(name, group)| (name.clone(), group.class.clone()))
            .chain(self.fields.keys().map(|name| (name.clone(), "SDS".to_string())))
            .collect()
    }
}

/// A container tree backed by a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusFile {
    root: NexusGroup,
}

impl Default for NexusFile {
    fn default() -> Self {
        Self::new()
    }
}

impl NexusFile {
    /// Create an empty file tree
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: NexusGroup::new(ROOT_CLASS),
        }
    }

    /// Root group
    #[inline]
    #[must_use]
    pub fn root(&self) -> &NexusGroup {
        &self.root
    }

    /// Root group for writing
    #[inline]
    pub fn root_mut(&mut self) -> &mut NexusGroup {
        &mut self.root
    }

    /// Write the tree to `path`
    ///
    /// # Errors
    /// [`HistoryError::Io`] or [`HistoryError::Format`]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| HistoryError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|e| HistoryError::io_error(path, e))?;
        tracing::debug!(path = %path.display(), "history file written");
        Ok(())
    }

    /// Read a tree from `path`
    ///
    /// # Errors
    /// [`HistoryError::Io`] or [`HistoryError::Format`]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| HistoryError::io_error(path, e))?;
        serde_json::from_str(&json).map_err(|source| HistoryError::Format {
            path: path.to_path_buf(),
            source,
        })
    }
}

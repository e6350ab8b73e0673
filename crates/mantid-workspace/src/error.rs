//! Error types for workspace groups

/// Errors raised by [`WorkspaceGroup`](crate::WorkspaceGroup) membership changes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    /// The member is the group itself or one of its ancestors
    #[error("cannot add '{member}' to group '{group}': the group would contain itself")]
    Cycle { group: String, member: String },

    /// Positional access past the end of the group
    #[error("index {index} is out of range for group '{group}' of size {size}")]
    IndexOutOfRange {
        group: String,
        index: usize,
        size: usize,
    },

    /// No member with the requested name
    #[error("workspace '{name}' is not a member of group '{group}'")]
    NotFound { group: String, name: String },
}

impl GroupError {
    /// Check if the error came from a rejected insertion
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }
}

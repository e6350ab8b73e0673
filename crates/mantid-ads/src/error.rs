//! Error types for the Analysis Data Service
//!
//! Every error maps onto one of three categories (see [`ErrorKind`]):
//! - caller mistakes such as illegal names or self-containing groups
//! - references to names that are not registered
//! - structural misuse such as group operations on plain workspaces

use mantid_store::StoreError;
use mantid_workspace::GroupError;
use std::path::PathBuf;

/// Broad category of an [`AdsError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed something that can never succeed
    InvalidArgument,
    /// A referenced name is not registered
    NotFound,
    /// The registry is not in a state that allows the operation
    Runtime,
}

/// Main data service error type
#[derive(Debug, thiserror::Error)]
pub enum AdsError {
    /// Name contains an illegal character
    #[error("{0}")]
    InvalidName(String),

    /// A group would be registered under the name of one of its descendants
    #[error("Unable to add group as name matches its members")]
    GroupNameMatchesMember,

    /// A group would be renamed to the name of one of its descendants
    #[error("Unable to rename group as new name matches its members")]
    RenameMatchesMember,

    /// Other rejected arguments
    #[error("{0}")]
    InvalidArgument(String),

    /// Underlying store refused the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Group membership change refused
    #[error(transparent)]
    Group(#[from] GroupError),

    /// Group-only operation on a plain workspace
    #[error("Workspace {0} is not a workspace group.")]
    NotAGroup(String),

    /// Typed retrieval of a workspace of another type
    #[error("Workspace {name} is not of the correct type (found {id})")]
    WrongType { name: String, id: String },

    /// Removal of a member the group does not hold
    #[error("WorkspaceGroup {group} does not contain workspace {member}")]
    NotInGroup { group: String, member: String },

    /// No free unique name within the attempt budget
    #[error("Unable to generate a unique name after {attempts} attempts")]
    NameSpaceExhausted { attempts: usize },

    /// Configuration text could not be parsed
    #[error("invalid data service configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("cannot read data service configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AdsError {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_)
            | Self::GroupNameMatchesMember
            | Self::RenameMatchesMember
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Store(StoreError::EmptyName)
            | Self::Group(GroupError::Cycle { .. }) => ErrorKind::InvalidArgument,
            Self::Store(StoreError::NotFound(_)) | Self::Group(GroupError::NotFound { .. }) => {
                ErrorKind::NotFound
            }
            Self::Store(StoreError::AlreadyExists(_))
            | Self::Group(GroupError::IndexOutOfRange { .. })
            | Self::NotAGroup(_)
            | Self::WrongType { .. }
            | Self::NotInGroup { .. }
            | Self::NameSpaceExhausted { .. }
            | Self::Io { .. } => ErrorKind::Runtime,
        }
    }

    /// Check if the error is a caller mistake
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// Check if a referenced name was missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(AdsError::InvalidName("bad".into()).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            AdsError::from(StoreError::NotFound("x".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(AdsError::NotAGroup("x".into()).kind(), ErrorKind::Runtime);
        assert_eq!(
            AdsError::from(GroupError::Cycle {
                group: "g".into(),
                member: "g".into()
            })
            .kind(),
            ErrorKind::InvalidArgument
        );
        assert!(AdsError::NameSpaceExhausted { attempts: 1 }.kind() == ErrorKind::Runtime);
    }

    #[test]
    fn messages_name_the_offender() {
        assert_eq!(
            AdsError::NotAGroup("raw".into()).to_string(),
            "Workspace raw is not a workspace group."
        );
        assert_eq!(
            AdsError::from(StoreError::NotFound("raw".into())).to_string(),
            "data object 'raw' not found"
        );
    }
}

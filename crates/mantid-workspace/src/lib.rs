//! Mantid workspaces
//!
//! Shared data objects that the analysis data service registers by name.
//!
//! # Overview
//!
//! - **Workspace**: trait every registrable object implements; carries a
//!   name and a [`WorkspaceHistory`](mantid_history::WorkspaceHistory)
//! - **WorkspaceGroup**: a workspace made of other workspaces, cycle free
//! - **DataWorkspace**: simple numeric workspace
//!
//! # Example
//!
//! ```rust
//! use mantid_workspace::{DataWorkspace, Workspace, WorkspaceGroup};
//! use std::sync::Arc;
//!
//! let group = Arc::new(WorkspaceGroup::new());
//! let member: Arc<dyn Workspace> = Arc::new(DataWorkspace::new(vec![1.0, 2.0]));
//! member.set_name("run_1");
//! assert!(group.add_workspace(member).unwrap());
//! assert!(group.contains_in_children("run_1"));
//! ```

#![warn(missing_docs)]

pub mod data;
pub mod error;
pub mod group;
pub mod workspace;

// Re-exports
pub use data::DataWorkspace;
pub use error::GroupError;
pub use group::{WorkspaceGroup, WorkspaceNotificationCenter};
pub use workspace::{
    as_group_arc, downcast_workspace, merge_history_from, same_workspace, Workspace,
    WorkspaceAddress, WorkspaceCore,
};

/// Shared handle to any workspace
pub type WorkspaceSptr = std::sync::Arc<dyn Workspace>;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for workspace handling
    pub use crate::{DataWorkspace, GroupError, Workspace, WorkspaceGroup, WorkspaceSptr};
}

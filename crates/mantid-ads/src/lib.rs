//! Mantid Analysis Data Service
//!
//! The process-wide registry of named workspaces, constructed explicitly and
//! shared by handle.
//!
//! # Overview
//!
//! - **AnalysisDataService**: strict and replacing registration, rename,
//!   removal, typed retrieval, group cascading and unique name generation
//! - **AdsConfig**: illegal name characters, hidden workspace listing and
//!   the unique name attempt budget, loadable from TOML
//! - **AdsError**: errors classified by [`ErrorKind`]
//!
//! # Example
//!
//! ```rust
//! use mantid_ads::{AdsConfig, AnalysisDataService};
//! use mantid_workspace::{DataWorkspace, Workspace, WorkspaceGroup};
//! use std::sync::Arc;
//!
//! let ads = Arc::new(AnalysisDataService::new(AdsConfig::new()));
//! let group = WorkspaceGroup::with_members(vec![
//!     Arc::new(DataWorkspace::new(vec![1.0])) as Arc<dyn Workspace>,
//!     Arc::new(DataWorkspace::new(vec![2.0])) as Arc<dyn Workspace>,
//! ]);
//! ads.add("runs", Arc::new(group)).unwrap();
//!
//! assert!(ads.does_exist("runs_1"));
//! assert!(ads.does_exist("runs_2"));
//! assert_eq!(ads.top_level_items().len(), 1);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod naming;
pub mod service;

// Re-exports
pub use config::AdsConfig;
pub use error::{AdsError, ErrorKind};
pub use mantid_store::{HiddenFilter, NameOrder, Notification, NotificationKind};
pub use service::AnalysisDataService;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for data service users
    pub use crate::{AdsConfig, AdsError, AnalysisDataService, ErrorKind, HiddenFilter, NameOrder};
    pub use mantid_workspace::{DataWorkspace, Workspace, WorkspaceGroup};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

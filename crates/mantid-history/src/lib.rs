//! Mantid provenance records
//!
//! Every workspace carries the list of algorithms that produced it. This
//! crate models that list and its persistence.
//!
//! # Overview
//!
//! - **AlgorithmHistory**: one algorithm execution with its properties and
//!   nested child executions
//! - **WorkspaceHistory**: ordered set of executions plus the environment
//! - **HistoryView**: flattened view that can unroll nested executions
//! - **NexusGroup / NexusFile**: hierarchical container the history is
//!   saved into
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use mantid_history::{AlgorithmHistory, Direction, NexusGroup, PropertyHistory, WorkspaceHistory};
//!
//! let mut history = WorkspaceHistory::new();
//! history.add_history(
//!     AlgorithmHistory::new("Rebin", 1, Utc::now(), 0.3).with_property(PropertyHistory::new(
//!         "Params", "1,0.5,10", "dbl list", false, Direction::Input,
//!     )),
//! );
//!
//! let mut entry = NexusGroup::new("NXentry");
//! history.save_nexus(&mut entry);
//!
//! let mut loaded = WorkspaceHistory::new();
//! loaded.load_nexus(&entry);
//! assert_eq!(loaded.size(), 1);
//! ```

#![warn(missing_docs)]

pub mod algorithm;
pub mod codec;
pub mod environment;
pub mod error;
pub mod nexus;
pub mod property;
pub mod replay;
pub mod view;
pub mod workspace_history;

// Re-exports
pub use algorithm::{next_execution_index, AlgorithmHistory, HistoryKey};
pub use codec::{HistoryRecordCodec, LegacyTextCodec, DATE_FORMAT};
pub use environment::EnvironmentHistory;
pub use error::{HistoryError, RecordParseError};
pub use nexus::{NexusField, NexusFile, NexusGroup};
pub use property::{Direction, PropertyHistory};
pub use replay::{AlgorithmFactory, ReplayableAlgorithm};
pub use view::{HistoryItem, HistoryView};
pub use workspace_history::WorkspaceHistory;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for history operations
    pub use crate::{
        AlgorithmHistory, Direction, HistoryError, HistoryView, NexusFile, NexusGroup,
        PropertyHistory, WorkspaceHistory,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

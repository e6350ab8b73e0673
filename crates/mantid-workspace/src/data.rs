//! A plain numeric workspace

use crate::workspace::{Workspace, WorkspaceCore};
use mantid_history::WorkspaceHistory;
use std::any::Any;
use std::sync::Arc;

/// Workspace holding a flat list of counts
#[derive(Debug, Default)]
pub struct DataWorkspace {
    core: WorkspaceCore,
    values: Vec<f64>,
}

impl DataWorkspace {
    /// Anonymous workspace with `values` and an empty history
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            core: WorkspaceCore::new(),
            values,
        }
    }

    /// Anonymous workspace that continues an existing history
    #[must_use]
    pub fn with_history(values: Vec<f64>, history: WorkspaceHistory) -> Self {
        Self {
            core: WorkspaceCore::with_history(history),
            values,
        }
    }

    /// Stored values
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl Workspace for DataWorkspace {
    fn id(&self) -> &str {
        "Workspace2D"
    }

    fn core(&self) -> &WorkspaceCore {
        &self.core
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

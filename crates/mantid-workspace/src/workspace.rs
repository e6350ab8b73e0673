//! The workspace abstraction
//!
//! A workspace is a named, shared data object carrying its own
//! [`WorkspaceHistory`]. Concrete types embed a [`WorkspaceCore`] and
//! implement [`Workspace`]; everything else (naming, history access,
//! downcasting) is provided on top of that.

use crate::group::WorkspaceGroup;
use mantid_history::{AlgorithmHistory, WorkspaceHistory};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// State shared by every workspace type
#[derive(Debug, Default)]
pub struct WorkspaceCore {
    name: RwLock<String>,
    history: RwLock<WorkspaceHistory>,
}

impl WorkspaceCore {
    /// Unnamed core with an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Core that starts from an existing history
    #[must_use]
    pub fn with_history(history: WorkspaceHistory) -> Self {
        Self {
            name: RwLock::new(String::new()),
            history: RwLock::new(history),
        }
    }
}

/// A named data object that can be registered in the data service
pub trait Workspace: Any + Send + Sync + fmt::Debug {
    /// Type discriminator, e.g. `Workspace2D` or `WorkspaceGroup`
    fn id(&self) -> &str;

    /// Shared naming and history state
    fn core(&self) -> &WorkspaceCore;

    /// This workspace as a group, if it is one
    fn as_group(&self) -> Option<&WorkspaceGroup> {
        None
    }

    /// Upcast for typed retrieval
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Name the workspace is registered under; empty when anonymous
    fn name(&self) -> String {
        self.core().name.read().clone()
    }

    /// Stamp a new name
    fn set_name(&self, name: &str) {
        *self.core().name.write() = name.to_string();
    }

    /// Read access to the history
    fn history(&self) -> RwLockReadGuard<'_, WorkspaceHistory> {
        self.core().history.read()
    }

    /// Write access to the history
    fn history_mut(&self) -> RwLockWriteGuard<'_, WorkspaceHistory> {
        self.core().history.write()
    }

    /// Append the record of an algorithm that produced this workspace
    fn record_algorithm(&self, record: AlgorithmHistory) {
        self.history_mut().add_history(record);
    }
}

/// Identity of a workspace object, compared by address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceAddress(usize);

impl WorkspaceAddress {
    /// Address of `ws`
    #[inline]
    #[must_use]
    pub fn of(ws: &dyn Workspace) -> Self {
        Self(std::ptr::addr_of!(*ws).cast::<()>() as usize)
    }
}

/// Whether two handles point at the same workspace object
#[inline]
#[must_use]
pub fn same_workspace(a: &dyn Workspace, b: &dyn Workspace) -> bool {
    WorkspaceAddress::of(a) == WorkspaceAddress::of(b)
}

/// Typed view of a shared workspace
#[must_use]
pub fn downcast_workspace<T: Workspace>(ws: Arc<dyn Workspace>) -> Option<Arc<T>> {
    ws.into_any().downcast::<T>().ok()
}

/// Shared workspace as a group, if it is one
#[must_use]
pub fn as_group_arc(ws: &Arc<dyn Workspace>) -> Option<Arc<WorkspaceGroup>> {
    if ws.as_group().is_none() {
        return None;
    }
    downcast_workspace::<WorkspaceGroup>(Arc::clone(ws))
}

/// Merge the history of `source` into `target`
///
/// Merging a workspace with itself changes nothing. The source history is
/// copied out before the target is locked, so merges in opposite directions
/// never hold both locks.
pub fn merge_history_from(target: &dyn Workspace, source: &dyn Workspace) {
    if same_workspace(target, source) {
        return;
    }
    let snapshot = source.history().clone();
    target.history_mut().add_workspace_history(&snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataWorkspace;
    use chrono::Utc;

    #[test]
    fn names_are_stamped() {
        let ws = DataWorkspace::new(vec![1.0]);
        assert_eq!(ws.name(), "");
        ws.set_name("raw");
        assert_eq!(ws.name(), "raw");
    }

    #[test]
    fn downcast_checks_type() {
        let ws: Arc<dyn Workspace> = Arc::new(DataWorkspace::new(vec![1.0, 2.0]));
        assert!(as_group_arc(&ws).is_none());
        let data = downcast_workspace::<DataWorkspace>(Arc::clone(&ws)).unwrap();
        assert_eq!(data.values(), &[1.0, 2.0]);
        assert!(downcast_workspace::<WorkspaceGroup>(ws).is_none());
    }

    #[test]
    fn self_merge_is_a_no_op() {
        let ws = DataWorkspace::new(vec![]);
        ws.record_algorithm(AlgorithmHistory::new("Load", 1, Utc::now(), 1.0));
        merge_history_from(&ws, &ws);
        assert_eq!(ws.history().size(), 1);
    }

    #[test]
    fn merge_copies_records_across() {
        let a = DataWorkspace::new(vec![]);
        let b = DataWorkspace::new(vec![]);
        a.record_algorithm(AlgorithmHistory::new("Load", 1, Utc::now(), 1.0));
        b.record_algorithm(AlgorithmHistory::new("CreateWorkspace", 1, Utc::now(), 0.1));

        merge_history_from(&a, &b);
        merge_history_from(&b, &a);
        assert_eq!(a.history().size(), 2);
        assert_eq!(*a.history(), *b.history());
    }
}

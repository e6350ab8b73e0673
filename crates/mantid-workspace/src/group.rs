//! Workspace groups
//!
//! A [`WorkspaceGroup`] is itself a workspace holding an ordered list of
//! member workspaces, which may be groups in turn. Membership is by object
//! identity, never by name, and a group can never end up containing itself.
//!
//! # Locking
//!
//! Every group guards its member list with its own mutex. Traversals copy
//! the member list out before descending, so no two group locks are held at
//! the same time and a traversal cannot deadlock against a concurrent edit.
//!
//! Edits that can create a cycle (adding or substituting a member) also hold
//! one process-wide structure lock across the cycle check and the insertion,
//! so two groups adding each other concurrently cannot both succeed.
//!
//! # Registry observation
//!
//! Once registered, a group keeps in step with the registry through
//! [`observe_ads_notifications`](WorkspaceGroup::observe_ads_notifications):
//! a member removed from the registry leaves the group, and a member
//! replaced in the registry is replaced in the group as well.

use crate::error::GroupError;
use crate::workspace::{same_workspace, Workspace, WorkspaceAddress, WorkspaceCore};
use mantid_store::{Notification, NotificationCenter, NotificationKind, SubscriptionId};
use parking_lot::{const_mutex, Mutex};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

/// Held across every cycle check and the insertion it guards
static STRUCTURE: Mutex<()> = const_mutex(());

/// Notification centre of a workspace registry
pub type WorkspaceNotificationCenter = NotificationCenter<dyn Workspace>;

/// Live subscriptions of a group; dropping it unsubscribes
struct AdsObserver {
    center: Weak<WorkspaceNotificationCenter>,
    subscriptions: [SubscriptionId; 2],
}

impl Drop for AdsObserver {
    fn drop(&mut self) {
        if let Some(center) = self.center.upgrade() {
            for id in self.subscriptions {
                center.unsubscribe(id);
            }
        }
    }
}

/// A workspace made of other workspaces
#[derive(Default)]
pub struct WorkspaceGroup {
    core: WorkspaceCore,
    members: Mutex<Vec<Arc<dyn Workspace>>>,
    observer: Mutex<Option<AdsObserver>>,
}

impl fmt::Debug for WorkspaceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceGroup")
            .field("name", &self.name())
            .field("members", &self.names())
            .field("observing_ads", &self.is_observing_ads())
            .finish()
    }
}

impl WorkspaceGroup {
    /// Empty, unnamed group
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Group holding `members` in order; repeated objects are kept once
    #[must_use]
    pub fn with_members(members: impl IntoIterator<Item = Arc<dyn Workspace>>) -> Self {
        let group = Self::new();
        {
            let mut list = group.members.lock();
            for ws in members {
                if !list.iter().any(|m| same_workspace(&**m, &*ws)) {
                    list.push(ws);
                }
            }
        }
        group
    }

    /// Append `ws` to the group
    ///
    /// Returns `Ok(false)` if `ws` is already a member.
    ///
    /// # Errors
    /// [`GroupError::Cycle`] if `ws` is this group or contains it
    pub fn add_workspace(&self, ws: Arc<dyn Workspace>) -> Result<bool, GroupError> {
        let _structure = STRUCTURE.lock();
        if self.would_cycle(&*ws) {
            return Err(GroupError::Cycle {
                group: self.name(),
                member: ws.name(),
            });
        }

        let mut members = self.members.lock();
        if members.iter().any(|m| same_workspace(&**m, &*ws)) {
            tracing::warn!(group = %self.name(), member = %ws.name(), "workspace already in group");
            return Ok(false);
        }
        members.push(ws);
        Ok(true)
    }

    /// Whether any member or nested member is called `name`
    #[must_use]
    pub fn contains_in_children(&self, name: &str) -> bool {
        self.any_descendant(|ws| ws.name() == name)
    }

    /// Whether `ws` is a member of any group nested below this one
    #[must_use]
    pub fn is_in_child_group(&self, ws: &dyn Workspace) -> bool {
        let target = WorkspaceAddress::of(ws);
        self.members()
            .iter()
            .filter_map(|m| m.as_group())
            .any(|group| group.contains_descendant(target))
    }

    /// Whether holding `ws` would make this group its own descendant
    fn would_cycle(&self, ws: &dyn Workspace) -> bool {
        same_workspace(self, ws)
            || ws
                .as_group()
                .is_some_and(|group| group.contains_descendant(WorkspaceAddress::of(self)))
    }

    fn contains_descendant(&self, target: WorkspaceAddress) -> bool {
        self.any_descendant(|ws| WorkspaceAddress::of(&**ws) == target)
    }

    /// Depth-first search over all descendants, visiting each group once
    fn any_descendant(&self, mut found: impl FnMut(&Arc<dyn Workspace>) -> bool) -> bool {
        let mut visited = HashSet::from([WorkspaceAddress::of(self)]);
        let mut pending = self.members();
        while let Some(ws) = pending.pop() {
            if found(&ws) {
                return true;
            }
            if let Some(group) = ws.as_group() {
                if visited.insert(WorkspaceAddress::of(group)) {
                    pending.extend(group.members());
                }
            }
        }
        false
    }

    /// Number of direct members
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the group has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Snapshot of the direct members
    #[must_use]
    pub fn members(&self) -> Vec<Arc<dyn Workspace>> {
        self.members.lock().clone()
    }

    /// Names of the direct members in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.members.lock().iter().map(|m| m.name()).collect()
    }

    /// Member at `index`
    ///
    /// # Errors
    /// [`GroupError::IndexOutOfRange`]
    pub fn get_item(&self, index: usize) -> Result<Arc<dyn Workspace>, GroupError> {
        let members = self.members.lock();
        members
            .get(index)
            .cloned()
            .ok_or_else(|| GroupError::IndexOutOfRange {
                group: self.name(),
                index,
                size: members.len(),
            })
    }

    /// Direct member called `name`
    ///
    /// # Errors
    /// [`GroupError::NotFound`]
    pub fn get_item_by_name(&self, name: &str) -> Result<Arc<dyn Workspace>, GroupError> {
        self.members
            .lock()
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .ok_or_else(|| GroupError::NotFound {
                group: self.name(),
                name: name.to_string(),
            })
    }

    /// Whether a direct member is called `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.lock().iter().any(|m| m.name() == name)
    }

    /// Whether `ws` itself is a direct member
    #[must_use]
    pub fn contains_workspace(&self, ws: &dyn Workspace) -> bool {
        self.members.lock().iter().any(|m| same_workspace(&**m, ws))
    }

    /// Remove and return the member at `index`
    ///
    /// # Errors
    /// [`GroupError::IndexOutOfRange`]
    pub fn remove_item(&self, index: usize) -> Result<Arc<dyn Workspace>, GroupError> {
        let mut members = self.members.lock();
        if index >= members.len() {
            return Err(GroupError::IndexOutOfRange {
                group: self.name(),
                index,
                size: members.len(),
            });
        }
        Ok(members.remove(index))
    }

    /// Remove the first direct member called `name`
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Workspace>> {
        let mut members = self.members.lock();
        let index = members.iter().position(|m| m.name() == name)?;
        Some(members.remove(index))
    }

    /// Remove `ws` if it is a direct member
    pub fn remove_workspace(&self, ws: &dyn Workspace) -> bool {
        let mut members = self.members.lock();
        let before = members.len();
        members.retain(|m| !same_workspace(&**m, ws));
        members.len() != before
    }

    /// Drop every member
    pub fn remove_all(&self) {
        self.members.lock().clear();
    }

    /// Reorder members lexicographically by name
    pub fn sort_members_by_name(&self) {
        self.members.lock().sort_by_cached_key(|m| m.name());
    }

    /// Add the identities of all direct members to `out`
    pub fn report_members(&self, out: &mut HashSet<WorkspaceAddress>) {
        out.extend(self.members.lock().iter().map(|m| WorkspaceAddress::of(&**m)));
    }

    /// Put `new` where `old` was; returns whether anything changed
    fn replace_workspace(&self, old: &dyn Workspace, new: &Arc<dyn Workspace>) -> bool {
        let _structure = STRUCTURE.lock();
        if self.would_cycle(&**new) {
            tracing::warn!(group = %self.name(), member = %new.name(), "replacement would contain the group; ignored");
            return false;
        }
        let mut members = self.members.lock();
        let Some(index) = members.iter().position(|m| same_workspace(&**m, old)) else {
            return false;
        };
        if members.iter().any(|m| same_workspace(&**m, &**new)) {
            members.remove(index);
        } else {
            members[index] = Arc::clone(new);
        }
        true
    }

    /// Start or stop following removals and replacements in a registry
    pub fn observe_ads_notifications(
        self: &Arc<Self>,
        center: &Arc<WorkspaceNotificationCenter>,
        observe: bool,
    ) {
        let mut observer = self.observer.lock();
        if !observe {
            if observer.take().is_some() {
                tracing::debug!(group = %self.name(), "group stopped observing the data service");
            }
            return;
        }
        if observer.is_some() {
            return;
        }

        let group = Arc::downgrade(self);
        let on_delete = center.subscribe(NotificationKind::PreDelete, move |notification| {
            let (Some(group), Notification::PreDelete { object, name }) = (group.upgrade(), notification)
            else {
                return;
            };
            if group.remove_workspace(&**object) {
                tracing::debug!(group = %group.name(), member = %name, "member deleted from data service");
            }
        });

        let group = Arc::downgrade(self);
        let weak_center = Arc::downgrade(center);
        let on_replace = center.subscribe(NotificationKind::BeforeReplace, move |notification| {
            let (Some(group), Notification::BeforeReplace { old, new, .. }) = (group.upgrade(), notification)
            else {
                return;
            };
            if !group.replace_workspace(&**old, new) {
                return;
            }
            if let Some(center) = weak_center.upgrade() {
                let object: Arc<dyn Workspace> = Arc::clone(&group) as Arc<dyn Workspace>;
                center.post(&Notification::GroupUpdated {
                    name: group.name(),
                    object,
                });
            }
        });

        *observer = Some(AdsObserver {
            center: Arc::downgrade(center),
            subscriptions: [on_delete, on_replace],
        });
    }

    /// Whether the group currently follows a registry
    #[must_use]
    pub fn is_observing_ads(&self) -> bool {
        self.observer.lock().is_some()
    }
}

impl Workspace for WorkspaceGroup {
    fn id(&self) -> &str {
        "WorkspaceGroup"
    }

    fn core(&self) -> &WorkspaceCore {
        &self.core
    }

    fn as_group(&self) -> Option<&WorkspaceGroup> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Display for WorkspaceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WorkspaceGroup")?;
        for name in self.names() {
            writeln!(f, " -- {name}")?;
        }
        Ok(())
    }
}

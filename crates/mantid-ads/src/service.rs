//! The Analysis Data Service
//!
//! [`AnalysisDataService`] is the registry that owns every named workspace.
//! It wraps a [`NamedObjectStore`] with the workspace specific rules:
//!
//! - names are validated against a configurable set of illegal characters
//! - registering a group registers its members too, naming anonymous ones
//!   `<group>_<n>`
//! - a group can never be registered or renamed under the name of one of
//!   its own descendants
//! - group membership can be edited through the registry, which announces
//!   each change with a `GroupUpdated` notification
//!
//! All multi-step mutations run inside one store transaction, so other
//! threads never see a half registered group. Notifications are delivered
//! after the transaction ends.

use crate::config::AdsConfig;
use crate::error::AdsError;
use crate::naming::{self, HIDDEN_NAME_LENGTH, HIDDEN_NAME_PREFIX};
use mantid_store::{HiddenFilter, NameOrder, NamedObjectStore, Notification, StoreTransaction};
use mantid_workspace::{
    as_group_arc, downcast_workspace, same_workspace, Workspace, WorkspaceAddress, WorkspaceGroup,
    WorkspaceNotificationCenter,
};
use metrics::counter;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

type Transaction<'a> = StoreTransaction<'a, dyn Workspace>;

/// How a registration treats an existing binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Insert {
    Strict,
    Replace,
}

impl Insert {
    fn label(self) -> &'static str {
        match self {
            Self::Strict => "add",
            Self::Replace => "add_or_replace",
        }
    }
}

/// Named workspace registry
#[derive(Debug)]
pub struct AnalysisDataService {
    store: NamedObjectStore<dyn Workspace>,
    illegal_characters: RwLock<String>,
    attempts_per_char: usize,
}

impl Default for AnalysisDataService {
    fn default() -> Self {
        Self::new(AdsConfig::default())
    }
}

impl AnalysisDataService {
    /// Create an empty service
    #[must_use]
    pub fn new(config: AdsConfig) -> Self {
        let store = NamedObjectStore::new();
        store.set_show_hidden(config.show_hidden);
        tracing::info!(
            illegal_characters = %config.illegal_characters,
            show_hidden = config.show_hidden,
            "analysis data service created"
        );
        Self {
            store,
            illegal_characters: RwLock::new(config.illegal_characters),
            attempts_per_char: config.unique_name_attempts_per_char,
        }
    }

    /// Bus on which every registry change is announced
    #[inline]
    #[must_use]
    pub fn notification_center(&self) -> &Arc<WorkspaceNotificationCenter> {
        self.store.notification_center()
    }

    /// Characters currently forbidden in names
    #[must_use]
    pub fn illegal_characters(&self) -> String {
        self.illegal_characters.read().clone()
    }

    /// Replace the set of characters forbidden in names
    pub fn set_illegal_characters(&self, chars: &str) {
        *self.illegal_characters.write() = chars.to_string();
    }

    /// Why `name` is not acceptable; empty when it is
    #[must_use]
    pub fn is_valid(&self, name: &str) -> String {
        naming::validation_message(name, &self.illegal_characters.read()).unwrap_or_default()
    }

    /// Whether `name` follows the hidden workspace convention
    #[inline]
    #[must_use]
    pub fn is_hidden_name(name: &str) -> bool {
        mantid_store::is_hidden_name(name)
    }

    /// Whether hidden workspaces are listed by default
    #[inline]
    #[must_use]
    pub fn show_hidden(&self) -> bool {
        self.store.show_hidden()
    }

    /// Change whether hidden workspaces are listed by default
    #[inline]
    pub fn set_show_hidden(&self, show: bool) {
        self.store.set_show_hidden(show);
    }

    fn verify_name(&self, name: &str, ws: &dyn Workspace) -> Result<(), AdsError> {
        let message = self.is_valid(name);
        if !message.is_empty() {
            return Err(AdsError::InvalidName(message));
        }
        if ws.as_group().is_some_and(|group| group.contains_in_children(name)) {
            return Err(AdsError::GroupNameMatchesMember);
        }
        Ok(())
    }

    /// Register `ws` under `name`
    ///
    /// A group also registers each of its members that is not yet known,
    /// naming anonymous members `<name>_<position>`, and starts following
    /// registry changes so its membership stays consistent.
    ///
    /// # Errors
    /// [`AdsError::InvalidName`], [`AdsError::GroupNameMatchesMember`], or
    /// [`StoreError::AlreadyExists`](mantid_store::StoreError::AlreadyExists)
    pub fn add(&self, name: &str, ws: Arc<dyn Workspace>) -> Result<(), AdsError> {
        self.insert(name, ws, Insert::Strict)
    }

    /// Register `ws` under `name`, replacing any existing binding
    ///
    /// # Errors
    /// As [`add`](Self::add), without the already-exists case
    pub fn add_or_replace(&self, name: &str, ws: Arc<dyn Workspace>) -> Result<(), AdsError> {
        self.insert(name, ws, Insert::Replace)
    }

    fn insert(&self, name: &str, ws: Arc<dyn Workspace>, mode: Insert) -> Result<(), AdsError> {
        self.verify_name(name, &*ws)?;
        let mut txn = self.store.transaction();
        Self::bind(&mut txn, name, &ws, mode)?;
        self.mirror_group_members(&mut txn, name, &ws, mode);
        counter!("ads_operations_total", "op" => mode.label()).increment(1);
        Ok(())
    }

    fn bind(
        txn: &mut Transaction<'_>,
        name: &str,
        ws: &Arc<dyn Workspace>,
        mode: Insert,
    ) -> Result<(), AdsError> {
        match mode {
            Insert::Strict => txn.add(name, Arc::clone(ws))?,
            Insert::Replace => txn.add_or_replace(name, Arc::clone(ws))?,
        }
        ws.set_name(name);
        tracing::debug!(name, id = ws.id(), "workspace registered");
        Ok(())
    }

    /// Register the members of `ws` (if it is a group) and of nested groups
    ///
    /// A member that cannot be registered is logged and skipped; the group
    /// registration stands.
    fn mirror_group_members(
        &self,
        txn: &mut Transaction<'_>,
        name: &str,
        ws: &Arc<dyn Workspace>,
        mode: Insert,
    ) {
        let mut pending: Vec<(String, Arc<WorkspaceGroup>)> = as_group_arc(ws)
            .map(|group| (name.to_string(), group))
            .into_iter()
            .collect();

        while let Some((group_name, group)) = pending.pop() {
            group.observe_ads_notifications(self.notification_center(), true);

            for (index, member) in group.members().into_iter().enumerate() {
                let mut member_name = member.name();
                let mut member_mode = Insert::Strict;
                if member_name.is_empty() {
                    member_name = format!("{group_name}_{}", index + 1);
                    member_mode = mode;
                } else if txn.does_exist(&member_name) {
                    continue;
                }

                let registered = self
                    .verify_name(&member_name, &*member)
                    .and_then(|()| Self::bind(txn, &member_name, &member, member_mode));
                match registered {
                    Ok(()) => {
                        if let Some(subgroup) = as_group_arc(&member) {
                            pending.push((member_name, subgroup));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            group = %group_name,
                            member = %member_name,
                            error = %e,
                            "unable to register group member; skipping"
                        );
                    }
                }
            }
        }
    }

    /// Rename `old_name` to `new_name`
    ///
    /// An existing `new_name` binding is displaced.
    ///
    /// # Errors
    /// [`StoreError::NotFound`](mantid_store::StoreError::NotFound) for an
    /// unknown `old_name`, [`AdsError::InvalidName`] or
    /// [`AdsError::RenameMatchesMember`] for an unacceptable `new_name`
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<(), AdsError> {
        let mut txn = self.store.transaction();
        let ws = txn.retrieve(old_name)?;

        let message = self.is_valid(new_name);
        if !message.is_empty() {
            return Err(AdsError::InvalidName(message));
        }
        if ws.as_group().is_some_and(|group| group.contains_in_children(new_name)) {
            return Err(AdsError::RenameMatchesMember);
        }

        let displaced = txn.retrieve(new_name).ok();
        if txn.rename(old_name, new_name)? {
            if let Some(displaced) = displaced.filter(|other| !same_workspace(&**other, &*ws)) {
                displaced.set_name("");
            }
            ws.set_name(new_name);
            counter!("ads_operations_total", "op" => "rename").increment(1);
        }
        Ok(())
    }

    /// Unbind `name` and clear the workspace's name
    ///
    /// Unknown names are ignored. Group members stay registered. The name is
    /// cleared before the delete notifications go out.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Workspace>> {
        let mut txn = self.store.transaction();
        let removed = txn.remove(name);
        match &removed {
            Some(ws) => {
                ws.set_name("");
                counter!("ads_operations_total", "op" => "remove").increment(1);
            }
            None => tracing::debug!(name, "remove: workspace not registered"),
        }
        removed
    }

    /// Remove a group, every workspace nested in it, and the group itself
    ///
    /// Each workspace is removed once even if several groups share it.
    ///
    /// # Errors
    /// [`StoreError::NotFound`](mantid_store::StoreError::NotFound) or
    /// [`AdsError::NotAGroup`]
    pub fn deep_remove_group(&self, name: &str) -> Result<(), AdsError> {
        let mut txn = self.store.transaction();
        let ws = txn.retrieve(name)?;
        let root = as_group_arc(&ws).ok_or_else(|| AdsError::NotAGroup(name.to_string()))?;

        let mut removed = Vec::new();
        let mut visited = HashSet::from([WorkspaceAddress::of(&*ws)]);
        let mut pending = vec![root];
        while let Some(group) = pending.pop() {
            group.observe_ads_notifications(self.notification_center(), false);
            for member in group.members() {
                if !visited.insert(WorkspaceAddress::of(&*member)) {
                    continue;
                }
                if let Some(subgroup) = as_group_arc(&member) {
                    pending.push(subgroup);
                }
                removed.extend(Self::unbind_if_registered(&mut txn, &member));
            }
        }
        removed.extend(txn.remove(name));
        for ws in &removed {
            ws.set_name("");
        }
        drop(txn);

        counter!("ads_operations_total", "op" => "deep_remove_group").increment(1);
        tracing::debug!(name, removed = removed.len(), "group removed with its members");
        Ok(())
    }

    /// Remove `ws` under its own name if that name is bound to it
    fn unbind_if_registered(
        txn: &mut Transaction<'_>,
        ws: &Arc<dyn Workspace>,
    ) -> Option<Arc<dyn Workspace>> {
        let name = ws.name();
        let bound = txn.retrieve(&name).ok()?;
        if !same_workspace(&*bound, &**ws) {
            return None;
        }
        txn.remove(&name)
    }

    fn group_in(txn: &Transaction<'_>, name: &str) -> Result<Arc<WorkspaceGroup>, AdsError> {
        let ws = txn.retrieve(name)?;
        as_group_arc(&ws).ok_or_else(|| AdsError::NotAGroup(name.to_string()))
    }

    fn announce_group(txn: &mut Transaction<'_>, name: &str, group: Arc<WorkspaceGroup>) {
        txn.notify(Notification::GroupUpdated {
            name: name.to_string(),
            object: group,
        });
    }

    /// Add the registered workspace `ws_name` to the group `group_name`
    ///
    /// # Errors
    /// [`AdsError::NotAGroup`], [`AdsError::InvalidArgument`] when both
    /// names are equal, not-found errors, or
    /// [`GroupError::Cycle`](mantid_workspace::GroupError::Cycle)
    pub fn add_to_group(&self, group_name: &str, ws_name: &str) -> Result<(), AdsError> {
        let mut txn = self.store.transaction();
        let group = Self::group_in(&txn, group_name)?;
        if group_name == ws_name {
            return Err(AdsError::InvalidArgument(format!(
                "Unable to add group {group_name} to itself"
            )));
        }
        let ws = txn.retrieve(ws_name)?;
        group.add_workspace(ws)?;
        Self::announce_group(&mut txn, group_name, group);
        counter!("ads_operations_total", "op" => "add_to_group").increment(1);
        Ok(())
    }

    /// Take the member `ws_name` out of the group `group_name`
    ///
    /// The member stays registered.
    ///
    /// # Errors
    /// [`AdsError::NotAGroup`], not-found errors, or
    /// [`AdsError::NotInGroup`]
    pub fn remove_from_group(&self, group_name: &str, ws_name: &str) -> Result<(), AdsError> {
        let mut txn = self.store.transaction();
        let group = Self::group_in(&txn, group_name)?;
        if group.remove(ws_name).is_none() {
            return Err(AdsError::NotInGroup {
                group: group_name.to_string(),
                member: ws_name.to_string(),
            });
        }
        Self::announce_group(&mut txn, group_name, group);
        counter!("ads_operations_total", "op" => "remove_from_group").increment(1);
        Ok(())
    }

    /// Reorder the members of `group_name` by name
    ///
    /// # Errors
    /// Not-found errors or [`AdsError::NotAGroup`]
    pub fn sort_group_by_name(&self, group_name: &str) -> Result<(), AdsError> {
        let mut txn = self.store.transaction();
        let group = Self::group_in(&txn, group_name)?;
        group.sort_members_by_name();
        Self::announce_group(&mut txn, group_name, group);
        counter!("ads_operations_total", "op" => "sort_group_by_name").increment(1);
        Ok(())
    }

    /// Workspace registered as `name`
    ///
    /// # Errors
    /// [`StoreError::NotFound`](mantid_store::StoreError::NotFound)
    pub fn retrieve(&self, name: &str) -> Result<Arc<dyn Workspace>, AdsError> {
        Ok(self.store.retrieve(name)?)
    }

    /// Workspace registered as `name`, as a concrete type
    ///
    /// # Errors
    /// Not-found errors or [`AdsError::WrongType`]
    pub fn retrieve_ws<T: Workspace>(&self, name: &str) -> Result<Arc<T>, AdsError> {
        let ws = self.retrieve(name)?;
        let id = ws.id().to_string();
        downcast_workspace::<T>(ws).ok_or_else(|| AdsError::WrongType {
            name: name.to_string(),
            id,
        })
    }

    /// Group registered as `name`
    ///
    /// # Errors
    /// Not-found errors or [`AdsError::NotAGroup`]
    pub fn retrieve_group(&self, name: &str) -> Result<Arc<WorkspaceGroup>, AdsError> {
        let ws = self.retrieve(name)?;
        as_group_arc(&ws).ok_or_else(|| AdsError::NotAGroup(name.to_string()))
    }

    /// Resolve `names` in order
    ///
    /// With `unroll_groups`, every group is replaced in place by its
    /// members, recursively.
    ///
    /// # Errors
    /// Not-found error for the first unknown name
    pub fn retrieve_workspaces<S: AsRef<str>>(
        &self,
        names: &[S],
        unroll_groups: bool,
    ) -> Result<Vec<Arc<dyn Workspace>>, AdsError> {
        let mut found = Vec::with_capacity(names.len());
        for name in names {
            let ws = self.retrieve(name.as_ref())?;
            if unroll_groups {
                flatten_into(ws, &mut found);
            } else {
                found.push(ws);
            }
        }
        Ok(found)
    }

    /// Visible entries that are not a member of any registered group
    #[must_use]
    pub fn top_level_items(&self) -> BTreeMap<String, Arc<dyn Workspace>> {
        let entries = self.store.entries(HiddenFilter::Auto);
        let mut grouped = HashSet::new();
        for (_, ws) in &entries {
            if let Some(group) = ws.as_group() {
                group.report_members(&mut grouped);
            }
        }
        entries
            .into_iter()
            .filter(|(_, ws)| !grouped.contains(&WorkspaceAddress::of(&**ws)))
            .collect()
    }

    /// A name not yet registered: `prefix`, `length` random letters, `suffix`
    ///
    /// # Errors
    /// [`AdsError::InvalidArgument`] for a zero `length`,
    /// [`AdsError::NameSpaceExhausted`] if every attempt collided
    pub fn unique_name(&self, length: usize, prefix: &str, suffix: &str) -> Result<String, AdsError> {
        if length == 0 {
            return Err(AdsError::InvalidArgument(
                "Unique name length must be greater than zero".to_string(),
            ));
        }
        let attempts = length.saturating_mul(self.attempts_per_char);
        let mut rng = rand::rng();
        for _ in 0..attempts {
            let candidate = format!("{prefix}{}{suffix}", naming::random_body(&mut rng, length));
            if !self.does_exist(&candidate) {
                return Ok(candidate);
            }
        }
        tracing::warn!(length, prefix, suffix, attempts, "unique name generation exhausted");
        Err(AdsError::NameSpaceExhausted { attempts })
    }

    /// A free hidden name such as `__kqzvmbaxo`
    ///
    /// # Errors
    /// See [`unique_name`](Self::unique_name)
    pub fn unique_hidden_name(&self) -> Result<String, AdsError> {
        self.unique_name(HIDDEN_NAME_LENGTH, HIDDEN_NAME_PREFIX, "")
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn does_exist(&self, name: &str) -> bool {
        self.store.does_exist(name)
    }

    /// Number of registered workspaces, hidden ones included
    #[must_use]
    pub fn size(&self) -> usize {
        self.store.size()
    }

    /// Registered names
    #[must_use]
    pub fn object_names(&self, order: NameOrder, hidden: HiddenFilter) -> Vec<String> {
        self.store.object_names(order, hidden)
    }

    /// Registered workspaces in registration order
    #[must_use]
    pub fn objects(&self, hidden: HiddenFilter) -> Vec<Arc<dyn Workspace>> {
        self.store.objects(hidden)
    }

    /// Unregister everything
    pub fn clear(&self) {
        let mut txn = self.store.transaction();
        let removed = txn.objects();
        txn.clear();
        for ws in &removed {
            ws.set_name("");
        }
        drop(txn);
        counter!("ads_operations_total", "op" => "clear").increment(1);
        tracing::debug!(count = removed.len(), "analysis data service cleared");
    }
}

/// Push `ws`, or for a group all of its nested members, onto `out` in order
///
/// A group reached a second time is not expanded again.
fn flatten_into(ws: Arc<dyn Workspace>, out: &mut Vec<Arc<dyn Workspace>>) {
    let mut expanded = HashSet::new();
    let mut stack = vec![ws];
    while let Some(next) = stack.pop() {
        match next.as_group() {
            Some(group) => {
                if expanded.insert(WorkspaceAddress::of(group)) {
                    stack.extend(group.members().into_iter().rev());
                }
            }
            None => out.push(next),
        }
    }
}

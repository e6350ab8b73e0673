//! Named object store
//!
//! Provides [`NamedObjectStore`], a thread-safe `name -> Arc<T>` map that
//! announces every mutation through a [`NotificationCenter`].
//!
//! Single mutations lock, mutate, unlock and only then notify. Callers that
//! need several mutations to appear atomic (a group and its members, for
//! instance) open a [`StoreTransaction`], which holds the write lock for its
//! whole lifetime and flushes buffered notifications once the lock is gone.

use crate::error::StoreError;
use crate::notification::{Notification, NotificationCenter};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Prefix marking an object as hidden from default listings
pub const HIDDEN_PREFIX: &str = "__";

/// Check whether `name` denotes a hidden object
#[inline]
#[must_use]
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Ordering of names returned by listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameOrder {
    /// Lexicographic order
    Sorted,
    /// Registration order
    #[default]
    Unsorted,
}

/// Treatment of hidden objects in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HiddenFilter {
    /// Follow the store's `show_hidden` setting
    #[default]
    Auto,
    /// Always list hidden objects
    Include,
    /// Never list hidden objects
    Exclude,
}

type ObjectMap<T> = IndexMap<String, Arc<T>>;

/// Thread-safe mapping from unique names to shared objects
pub struct NamedObjectStore<T: ?Sized> {
    objects: RwLock<ObjectMap<T>>,
    notifications: Arc<NotificationCenter<T>>,
    show_hidden: AtomicBool,
}

impl<T: ?Sized> std::fmt::Debug for NamedObjectStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedObjectStore")
            .field("names", &self.objects.read().keys().collect::<Vec<_>>())
            .field("show_hidden", &self.show_hidden.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for NamedObjectStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> NamedObjectStore<T> {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(IndexMap::new()),
            notifications: Arc::new(NotificationCenter::new()),
            show_hidden: AtomicBool::new(false),
        }
    }

    /// Notification centre observers subscribe to
    #[inline]
    #[must_use]
    pub fn notification_center(&self) -> &Arc<NotificationCenter<T>> {
        &self.notifications
    }

    /// Whether [`HiddenFilter::Auto`] lists hidden objects
    #[inline]
    #[must_use]
    pub fn show_hidden(&self) -> bool {
        self.show_hidden.load(Ordering::Relaxed)
    }

    /// Change the [`HiddenFilter::Auto`] behaviour
    #[inline]
    pub fn set_show_hidden(&self, show: bool) {
        self.show_hidden.store(show, Ordering::Relaxed);
    }

    /// Open an exclusive write transaction
    ///
    /// Notifications raised through the transaction are posted after the
    /// transaction is dropped and the lock released.
    #[must_use]
    pub fn transaction(&self) -> StoreTransaction<'_, T> {
        StoreTransaction {
            objects: self.objects.write(),
            outbox: Outbox {
                center: &self.notifications,
                pending: Vec::new(),
            },
        }
    }

    /// Add `object` under `name`, failing if the name is taken
    ///
    /// # Errors
    /// [`StoreError::EmptyName`] or [`StoreError::AlreadyExists`]
    pub fn add(&self, name: &str, object: Arc<T>) -> Result<(), StoreError> {
        self.transaction().add(name, object)
    }

    /// Add `object` under `name`, replacing any existing binding
    ///
    /// # Errors
    /// [`StoreError::EmptyName`]
    pub fn add_or_replace(&self, name: &str, object: Arc<T>) -> Result<(), StoreError> {
        self.transaction().add_or_replace(name, object)
    }

    /// Remove the binding for `name`; absent names are ignored
    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.transaction().remove(name)
    }

    /// Rename `old_name` to `new_name`
    ///
    /// Returns `Ok(false)` when nothing was renamed (missing source or
    /// identical names). An existing `new_name` binding is displaced.
    ///
    /// # Errors
    /// [`StoreError::EmptyName`] when `new_name` is empty
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<bool, StoreError> {
        self.transaction().rename(old_name, new_name)
    }

    /// Remove every binding
    pub fn clear(&self) {
        self.transaction().clear();
    }

    /// Look up `name`
    ///
    /// # Errors
    /// [`StoreError::NotFound`]
    pub fn retrieve(&self, name: &str) -> Result<Arc<T>, StoreError> {
        self.objects
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Check whether `name` is bound
    #[must_use]
    pub fn does_exist(&self, name: &str) -> bool {
        self.objects.read().contains_key(name)
    }

    /// Number of bindings, hidden ones included
    #[must_use]
    pub fn size(&self) -> usize {
        self.objects.read().len()
    }

    /// Names of stored objects
    #[must_use]
    pub fn object_names(&self, order: NameOrder, hidden: HiddenFilter) -> Vec<String> {
        let include_hidden = self.include_hidden(hidden);
        let mut names: Vec<String> = self
            .objects
            .read()
            .keys()
            .filter(|name| include_hidden || !is_hidden_name(name))
            .cloned()
            .collect();
        if order == NameOrder::Sorted {
            names.sort();
        }
        names
    }

    /// Stored objects in registration order
    #[must_use]
    pub fn objects(&self, hidden: HiddenFilter) -> Vec<Arc<T>> {
        let include_hidden = self.include_hidden(hidden);
        self.objects
            .read()
            .iter()
            .filter(|(name, _)| include_hidden || !is_hidden_name(name))
            .map(|(_, object)| Arc::clone(object))
            .collect()
    }

    /// Snapshot of `(name, object)` pairs in registration order
    #[must_use]
    pub fn entries(&self, hidden: HiddenFilter) -> Vec<(String, Arc<T>)> {
        let include_hidden = self.include_hidden(hidden);
        self.objects
            .read()
            .iter()
            .filter(|(name, _)| include_hidden || !is_hidden_name(name))
            .map(|(name, object)| (name.clone(), Arc::clone(object)))
            .collect()
    }

    fn include_hidden(&self, hidden: HiddenFilter) -> bool {
        match hidden {
            HiddenFilter::Auto => self.show_hidden(),
            HiddenFilter::Include => true,
            HiddenFilter::Exclude => false,
        }
    }
}

/// Notifications waiting for the write lock to be released
struct Outbox<'a, T: ?Sized> {
    center: &'a NotificationCenter<T>,
    pending: Vec<Notification<T>>,
}

impl<T: ?Sized> Drop for Outbox<'_, T> {
    fn drop(&mut self) {
        self.center.post_all(std::mem::take(&mut self.pending));
    }
}

/// Exclusive write access to a [`NamedObjectStore`]
///
/// Field order matters: the lock guard is dropped before the outbox, so
/// observers never run while the store is locked.
pub struct StoreTransaction<'a, T: ?Sized> {
    objects: RwLockWriteGuard<'a, ObjectMap<T>>,
    outbox: Outbox<'a, T>,
}

impl<T: ?Sized> StoreTransaction<'_, T> {
    /// Queue an extra notification for delivery after unlock
    pub fn notify(&mut self, notification: Notification<T>) {
        self.outbox.pending.push(notification);
    }

    /// See [`NamedObjectStore::add`]
    ///
    /// # Errors
    /// [`StoreError::EmptyName`] or [`StoreError::AlreadyExists`]
    pub fn add(&mut self, name: &str, object: Arc<T>) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if self.objects.contains_key(name) {
            tracing::debug!(name, "add rejected: name already in use");
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        self.objects.insert(name.to_string(), Arc::clone(&object));
        tracing::debug!(name, "data object added");
        self.notify(Notification::Add {
            name: name.to_string(),
            object,
        });
        Ok(())
    }

    /// See [`NamedObjectStore::add_or_replace`]
    ///
    /// # Errors
    /// [`StoreError::EmptyName`]
    pub fn add_or_replace(&mut self, name: &str, object: Arc<T>) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let Some(slot) = self.objects.get_mut(name) else {
            return self.add(name, object);
        };
        let old = std::mem::replace(slot, Arc::clone(&object));
        tracing::debug!(name, "data object replaced");
        self.notify(Notification::BeforeReplace {
            name: name.to_string(),
            old,
            new: Arc::clone(&object),
        });
        self.notify(Notification::AfterReplace {
            name: name.to_string(),
            object,
        });
        Ok(())
    }

    /// See [`NamedObjectStore::remove`]
    pub fn remove(&mut self, name: &str) -> Option<Arc<T>> {
        let Some(object) = self.objects.shift_remove(name) else {
            tracing::debug!(name, "remove: data object not found");
            return None;
        };
        tracing::debug!(name, "data object removed");
        self.notify(Notification::PreDelete {
            name: name.to_string(),
            object: Arc::clone(&object),
        });
        self.notify(Notification::PostDelete {
            name: name.to_string(),
        });
        Some(object)
    }

    /// See [`NamedObjectStore::rename`]
    ///
    /// # Errors
    /// [`StoreError::EmptyName`] when `new_name` is empty
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<bool, StoreError> {
        if new_name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if old_name == new_name {
            tracing::warn!(name = old_name, "rename: the existing name matches the new name");
            return Ok(false);
        }
        if !self.objects.contains_key(old_name) {
            tracing::warn!(name = old_name, "rename: data object cannot be found");
            return Ok(false);
        }

        if let Some(displaced) = self.objects.shift_remove(new_name) {
            self.notify(Notification::PreDelete {
                name: new_name.to_string(),
                object: displaced,
            });
            self.notify(Notification::PostDelete {
                name: new_name.to_string(),
            });
        }
        if let Some((index, _, object)) = self.objects.shift_remove_full(old_name) {
            self.objects.shift_insert(index, new_name.to_string(), object);
        }

        tracing::debug!(old_name, new_name, "data object renamed");
        self.notify(Notification::Rename {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
        Ok(true)
    }

    /// See [`NamedObjectStore::clear`]
    pub fn clear(&mut self) {
        self.objects.clear();
        tracing::debug!("data store cleared");
        self.notify(Notification::Clear);
    }

    /// Look up `name` inside the transaction
    ///
    /// # Errors
    /// [`StoreError::NotFound`]
    pub fn retrieve(&self, name: &str) -> Result<Arc<T>, StoreError> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Check whether `name` is bound
    #[must_use]
    pub fn does_exist(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Objects currently stored, in registration order
    #[must_use]
    pub fn objects(&self) -> Vec<Arc<T>> {
        self.objects.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use parking_lot::Mutex;

    fn store() -> NamedObjectStore<String> {
        NamedObjectStore::new()
    }

    fn obj(s: &str) -> Arc<String> {
        Arc::new(s.to_string())
    }

    fn record_kinds(store: &NamedObjectStore<String>) -> Arc<Mutex<Vec<NotificationKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .notification_center()
            .subscribe_all(move |n| sink.lock().push(n.kind()));
        seen
    }

    #[test]
    fn add_and_retrieve() {
        let store = store();
        store.add("a", obj("one")).unwrap();
        assert_eq!(*store.retrieve("a").unwrap(), "one");
        assert!(store.does_exist("a"));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn add_rejects_empty_and_duplicate_names() {
        let store = store();
        assert_eq!(store.add("", obj("x")), Err(StoreError::EmptyName));
        store.add("a", obj("one")).unwrap();
        assert_eq!(
            store.add("a", obj("two")),
            Err(StoreError::AlreadyExists("a".into()))
        );
        assert_eq!(*store.retrieve("a").unwrap(), "one");
    }

    #[test]
    fn add_or_replace_overwrites() {
        let store = store();
        let seen = record_kinds(&store);
        store.add_or_replace("a", obj("one")).unwrap();
        store.add_or_replace("a", obj("two")).unwrap();
        assert_eq!(*store.retrieve("a").unwrap(), "two");
        assert_eq!(
            *seen.lock(),
            vec![
                NotificationKind::Add,
                NotificationKind::BeforeReplace,
                NotificationKind::AfterReplace
            ]
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let store = store();
        store.add("a", obj("one")).unwrap();
        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert!(matches!(store.retrieve("a"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn rename_moves_binding_in_place() {
        let store = store();
        store.add("a", obj("one")).unwrap();
        store.add("b", obj("two")).unwrap();
        store.add("c", obj("three")).unwrap();

        assert!(store.rename("b", "z").unwrap());
        assert_eq!(
            store.object_names(NameOrder::Unsorted, HiddenFilter::Include),
            vec!["a", "z", "c"]
        );
        assert_eq!(*store.retrieve("z").unwrap(), "two");
    }

    #[test]
    fn rename_displaces_existing_target() {
        let store = store();
        store.add("a", obj("one")).unwrap();
        store.add("b", obj("two")).unwrap();
        let seen = record_kinds(&store);

        assert!(store.rename("a", "b").unwrap());
        assert_eq!(store.size(), 1);
        assert_eq!(*store.retrieve("b").unwrap(), "one");
        assert_eq!(
            *seen.lock(),
            vec![
                NotificationKind::PreDelete,
                NotificationKind::PostDelete,
                NotificationKind::Rename
            ]
        );
    }

    #[test]
    fn rename_missing_or_same_is_noop() {
        let store = store();
        store.add("a", obj("one")).unwrap();
        assert!(!store.rename("missing", "x").unwrap());
        assert!(!store.rename("a", "a").unwrap());
        assert_eq!(store.rename("a", ""), Err(StoreError::EmptyName));
    }

    #[test]
    fn hidden_names_follow_filter() {
        let store = store();
        store.add("visible", obj("v")).unwrap();
        store.add("__hidden", obj("h")).unwrap();

        assert_eq!(
            store.object_names(NameOrder::Sorted, HiddenFilter::Auto),
            vec!["visible"]
        );
        assert_eq!(
            store.object_names(NameOrder::Sorted, HiddenFilter::Include),
            vec!["__hidden", "visible"]
        );

        store.set_show_hidden(true);
        assert_eq!(store.objects(HiddenFilter::Auto).len(), 2);
        assert_eq!(store.objects(HiddenFilter::Exclude).len(), 1);
    }

    #[test]
    fn transaction_defers_notifications_until_dropped() {
        let store = Arc::new(store());
        let observed_sizes = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&store);
        let sink = Arc::clone(&observed_sizes);
        store.notification_center().subscribe_all(move |_| {
            // Reading the store here would deadlock if the lock were held
            if let Some(store) = weak.upgrade() {
                sink.lock().push(store.size());
            }
        });

        {
            let mut txn = store.transaction();
            txn.add("a", obj("one")).unwrap();
            txn.add("b", obj("two")).unwrap();
            assert!(observed_sizes.lock().is_empty());
        }

        assert_eq!(*observed_sizes.lock(), vec![2, 2]);
    }

    #[test]
    fn clear_empties_store() {
        let store = store();
        store.add("a", obj("one")).unwrap();
        let seen = record_kinds(&store);
        store.clear();
        assert_eq!(store.size(), 0);
        assert_eq!(*seen.lock(), vec![NotificationKind::Clear]);
    }

    #[test]
    fn concurrent_adds_keep_every_name() {
        let store = Arc::new(store());
        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..100 {
                        store.add(&format!("ws_{t}_{i}"), obj("x")).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.size(), 800);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn names_stay_unique(names in proptest::collection::vec("[a-c]{1,2}", 0..40)) {
                let store = NamedObjectStore::<String>::new();
                for name in &names {
                    let _ = store.add(name, Arc::new(name.clone()));
                }
                let listed = store.object_names(NameOrder::Sorted, HiddenFilter::Include);
                let mut unique = names.clone();
                unique.sort();
                unique.dedup();
                prop_assert_eq!(listed, unique);
            }
        }
    }
}

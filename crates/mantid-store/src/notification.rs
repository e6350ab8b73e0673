//! Store change notifications
//!
//! Provides [`NotificationCenter`], the publish/subscribe bus a
//! [`NamedObjectStore`](crate::NamedObjectStore) uses to announce mutations.
//!
//! Handlers run on the posting thread, after the store lock has been
//! released. A handler may post further notifications or unsubscribe, but it
//! must not mutate the store that notified it. Observers that need to react
//! with store mutations should take a queued [`channel`](NotificationCenter::channel)
//! and process it from their own thread.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Discriminant of a [`Notification`], used for filtered subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// An object was added under a new name
    Add,
    /// An existing object is about to be replaced
    BeforeReplace,
    /// An existing object has been replaced
    AfterReplace,
    /// An object is being removed
    PreDelete,
    /// An object has been removed
    PostDelete,
    /// An entry was renamed
    Rename,
    /// The store was emptied
    Clear,
    /// A composite entry changed its membership in place
    GroupUpdated,
}

/// A single store mutation event
pub enum Notification<T: ?Sized> {
    /// `object` was added under `name`
    Add { name: String, object: Arc<T> },
    /// `old` is about to be replaced by `new` under `name`
    BeforeReplace {
        name: String,
        old: Arc<T>,
        new: Arc<T>,
    },
    /// `object` now lives under `name`, replacing a previous object
    AfterReplace { name: String, object: Arc<T> },
    /// `object` has been unbound from `name`
    PreDelete { name: String, object: Arc<T> },
    /// `name` no longer resolves
    PostDelete { name: String },
    /// The entry `old_name` is now reachable as `new_name`
    Rename { old_name: String, new_name: String },
    /// Every entry was removed
    Clear,
    /// The composite registered as `name` gained, lost or reordered members
    GroupUpdated { name: String, object: Arc<T> },
}

impl<T: ?Sized> Notification<T> {
    /// Kind of this notification
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Add { .. } => NotificationKind::Add,
            Self::BeforeReplace { .. } => NotificationKind::BeforeReplace,
            Self::AfterReplace { .. } => NotificationKind::AfterReplace,
            Self::PreDelete { .. } => NotificationKind::PreDelete,
            Self::PostDelete { .. } => NotificationKind::PostDelete,
            Self::Rename { .. } => NotificationKind::Rename,
            Self::Clear => NotificationKind::Clear,
            Self::GroupUpdated { .. } => NotificationKind::GroupUpdated,
        }
    }

    /// Name the notification refers to (new name for renames)
    #[must_use]
    pub fn object_name(&self) -> Option<&str> {
        match self {
            Self::Add { name, .. }
            | Self::BeforeReplace { name, .. }
            | Self::AfterReplace { name, .. }
            | Self::PreDelete { name, .. }
            | Self::PostDelete { name }
            | Self::GroupUpdated { name, .. } => Some(name),
            Self::Rename { new_name, .. } => Some(new_name),
            Self::Clear => None,
        }
    }
}

impl<T: ?Sized> Clone for Notification<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Add { name, object } => Self::Add {
                name: name.clone(),
                object: Arc::clone(object),
            },
            Self::BeforeReplace { name, old, new } => Self::BeforeReplace {
                name: name.clone(),
                old: Arc::clone(old),
                new: Arc::clone(new),
            },
            Self::AfterReplace { name, object } => Self::AfterReplace {
                name: name.clone(),
                object: Arc::clone(object),
            },
            Self::PreDelete { name, object } => Self::PreDelete {
                name: name.clone(),
                object: Arc::clone(object),
            },
            Self::PostDelete { name } => Self::PostDelete { name: name.clone() },
            Self::Rename { old_name, new_name } => Self::Rename {
                old_name: old_name.clone(),
                new_name: new_name.clone(),
            },
            Self::Clear => Self::Clear,
            Self::GroupUpdated { name, object } => Self::GroupUpdated {
                name: name.clone(),
                object: Arc::clone(object),
            },
        }
    }
}

impl<T: ?Sized> fmt::Debug for Notification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename { old_name, new_name } => f
                .debug_struct("Rename")
                .field("old_name", old_name)
                .field("new_name", new_name)
                .finish(),
            Self::Clear => f.write_str("Clear"),
            other => f
                .debug_struct(&format!("{:?}", other.kind()))
                .field("name", &other.object_name().unwrap_or_default())
                .finish(),
        }
    }
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<T> = Arc<dyn Fn(&Notification<T>) + Send + Sync>;

enum Target<T: ?Sized> {
    Callback(Handler<T>),
    Queue(Sender<Notification<T>>),
}

impl<T: ?Sized> Clone for Target<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Callback(handler) => Self::Callback(Arc::clone(handler)),
            Self::Queue(sender) => Self::Queue(sender.clone()),
        }
    }
}

struct Subscription<T: ?Sized> {
    id: SubscriptionId,
    /// `None` matches every kind
    kinds: Option<Vec<NotificationKind>>,
    target: Target<T>,
}

impl<T: ?Sized> Subscription<T> {
    fn matches(&self, kind: NotificationKind) -> bool {
        self.kinds.as_ref().map_or(true, |kinds| kinds.contains(&kind))
    }
}

/// Typed publish/subscribe bus for store notifications
pub struct NotificationCenter<T: ?Sized> {
    subscriptions: Mutex<Vec<Subscription<T>>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> fmt::Debug for NotificationCenter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("subscribers", &self.subscriptions.lock().len())
            .finish()
    }
}

impl<T: ?Sized> Default for NotificationCenter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> NotificationCenter<T> {
    /// Create a centre with no subscribers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn register(&self, kinds: Option<Vec<NotificationKind>>, target: Target<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().push(Subscription { id, kinds, target });
        id
    }

    /// Invoke `handler` for every notification of `kind`
    pub fn subscribe<F>(&self, kind: NotificationKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification<T>) + Send + Sync + 'static,
    {
        self.register(Some(vec![kind]), Target::Callback(Arc::new(handler)))
    }

    /// Invoke `handler` for every notification
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification<T>) + Send + Sync + 'static,
    {
        self.register(None, Target::Callback(Arc::new(handler)))
    }

    /// Queue notifications of the given kinds (all kinds when empty)
    ///
    /// The subscription is dropped automatically once the receiver is gone.
    pub fn channel(&self, kinds: &[NotificationKind]) -> (SubscriptionId, Receiver<Notification<T>>) {
        let (tx, rx) = channel::unbounded();
        let kinds = if kinds.is_empty() {
            None
        } else {
            Some(kinds.to_vec())
        };
        (self.register(kinds, Target::Queue(tx)), rx)
    }

    /// Remove a subscription; returns `false` if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Deliver `notification` to every matching subscriber
    pub fn post(&self, notification: &Notification<T>) {
        let kind = notification.kind();
        let targets: Vec<(SubscriptionId, Target<T>)> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.matches(kind))
            .map(|s| (s.id, s.target.clone()))
            .collect();

        let mut disconnected = Vec::new();
        for (id, target) in targets {
            match target {
                Target::Callback(handler) => handler(notification),
                Target::Queue(sender) => {
                    if sender.send(notification.clone()).is_err() {
                        disconnected.push(id);
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            tracing::debug!(count = disconnected.len(), "dropping disconnected notification queues");
            self.subscriptions
                .lock()
                .retain(|s| !disconnected.contains(&s.id));
        }
    }

    /// Deliver a batch of notifications in order
    pub fn post_all(&self, notifications: impl IntoIterator<Item = Notification<T>>) {
        for notification in notifications {
            self.post(&notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn add(name: &str) -> Notification<i32> {
        Notification::Add {
            name: name.to_string(),
            object: Arc::new(1),
        }
    }

    #[test]
    fn subscribe_filters_by_kind() {
        let center = NotificationCenter::<i32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        center.subscribe(NotificationKind::Add, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        center.post(&add("a"));
        center.post(&Notification::PostDelete { name: "a".into() });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribe_all_sees_everything() {
        let center = NotificationCenter::<i32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        center.subscribe_all(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        center.post_all(vec![add("a"), Notification::Clear, add("b")]);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let center = NotificationCenter::<i32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = center.subscribe_all(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(center.unsubscribe(id));
        assert!(!center.unsubscribe(id));
        center.post(&add("a"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn channel_queues_notifications() {
        let center = NotificationCenter::<i32>::new();
        let (_, rx) = center.channel(&[NotificationKind::Rename]);

        center.post(&add("ignored"));
        center.post(&Notification::Rename {
            old_name: "a".into(),
            new_name: "b".into(),
        });

        let received = rx.try_recv().unwrap();
        assert_eq!(received.kind(), NotificationKind::Rename);
        assert_eq!(received.object_name(), Some("b"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_channel_is_pruned_on_post() {
        let center = NotificationCenter::<i32>::new();
        let (_, rx) = center.channel(&[]);
        assert_eq!(center.subscriber_count(), 1);

        drop(rx);
        center.post(&add("a"));
        assert_eq!(center.subscriber_count(), 0);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let center = Arc::new(NotificationCenter::<i32>::new());
        let slot = Arc::new(Mutex::new(None::<SubscriptionId>));
        let hits = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&center);
        let own_id = Arc::clone(&slot);
        let counter = Arc::clone(&hits);
        let id = center.subscribe_all(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let (Some(center), Some(id)) = (weak.upgrade(), *own_id.lock()) {
                center.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        center.post(&add("a"));
        center.post(&add("b"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_output_names_the_kind() {
        let rendered = format!("{:?}", add("ws"));
        assert!(rendered.contains("Add"));
        assert!(rendered.contains("ws"));
    }
}

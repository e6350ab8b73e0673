//! Mantid named object store
//!
//! Generic, thread-safe registry mapping unique names to shared objects.
//!
//! # Overview
//!
//! The store provides:
//! - **NamedObjectStore**: `name -> Arc<T>` map with strict and replacing adds
//! - **StoreTransaction**: multi-step mutations under a single write lock
//! - **NotificationCenter**: typed publish/subscribe for store mutations
//!
//! # Example
//!
//! ```rust
//! use mantid_store::{NamedObjectStore, NotificationKind};
//! use std::sync::Arc;
//!
//! let store = NamedObjectStore::<String>::new();
//! store.notification_center().subscribe(NotificationKind::Add, |n| {
//!     println!("added {:?}", n.object_name());
//! });
//!
//! store.add("run_1234", Arc::new("raw counts".to_string())).unwrap();
//! assert!(store.does_exist("run_1234"));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod notification;
pub mod store;

// Re-exports
pub use error::StoreError;
pub use notification::{Notification, NotificationCenter, NotificationKind, SubscriptionId};
pub use store::{
    is_hidden_name, HiddenFilter, NameOrder, NamedObjectStore, StoreTransaction, HIDDEN_PREFIX,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store operations
    pub use crate::{
        HiddenFilter, NameOrder, NamedObjectStore, Notification, NotificationCenter,
        NotificationKind, StoreError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for the named object store

/// Errors raised by [`NamedObjectStore`](crate::NamedObjectStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Objects must be registered under a non-empty name
    #[error("cannot add data object with empty name")]
    EmptyName,

    /// Strict add over an existing binding
    #[error("data object '{0}' already exists")]
    AlreadyExists(String),

    /// Lookup of an unbound name
    #[error("data object '{0}' not found")]
    NotFound(String),
}

impl StoreError {
    /// Name the error refers to, if any
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::EmptyName => None,
            Self::AlreadyExists(name) | Self::NotFound(name) => Some(name),
        }
    }
}

//! Error types for the arena tree and the keyed store.

use core::fmt;
use std::collections::TryReserveError;
use thiserror::Error;

/// Rejection from [`ArenaTree::insert`](crate::arena_tree::ArenaTree::insert).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("key is already present in the tree")]
    DuplicateKey,
}

/// Recoverable failures surfaced by fallible store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to allocate {len} bytes for key storage")]
    KeyAlloc {
        len: usize,
        #[source]
        source: TryReserveError,
    },
}

/// A rejected [`KeyedStore::try_put`](crate::KeyedStore::try_put).
///
/// The store never took ownership of the value, so it is handed back here
/// instead of going through the release callback.
pub struct PutError<V> {
    error: StoreError,
    value: V,
}

impl<V> PutError<V> {
    pub(crate) fn new(error: StoreError, value: V) -> Self {
        Self { error, value }
    }

    pub fn error(&self) -> &StoreError {
        &self.error
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn into_parts(self) -> (StoreError, V) {
        (self.error, self.value)
    }
}

impl<V> fmt::Debug for PutError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<V> fmt::Display for PutError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "put rejected: {}", self.error)
    }
}

impl<V> std::error::Error for PutError<V> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

//! KeyedStore: string-keyed map that owns its entries and reports every value
//! it gives up to an optional release callback.

use crate::arena_tree::{self, ArenaTree};
use crate::error::{PutError, StoreError};
use core::fmt;
use core::iter::FusedIterator;
use log::{debug, trace, warn};
use std::collections::TryReserveError;

/// Callback invoked once per value the store stops owning, right before the
/// store drops it.
pub type ReleaseFn<V> = Box<dyn FnMut(Entry<'_, V>) + Send>;

/// Borrowed view of one stored key/value pair.
#[derive(Debug)]
pub struct Entry<'a, V> {
    key: &'a str,
    value: &'a V,
}

impl<'a, V> Entry<'a, V> {
    fn new(key: &'a str, value: &'a V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn value(&self) -> &'a V {
        self.value
    }
}

impl<V> Clone for Entry<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Entry<'_, V> {}

pub struct KeyedStore<V> {
    tree: ArenaTree<Box<str>, V>,
    release: Option<ReleaseFn<V>>,
}

fn notify<V>(release: &mut Option<ReleaseFn<V>>, key: &str, value: &V) {
    if let Some(f) = release.as_mut() {
        f(Entry::new(key, value));
    }
}

fn copy_key(key: &str) -> Result<Box<str>, TryReserveError> {
    let mut owned = String::new();
    owned.try_reserve_exact(key.len())?;
    owned.push_str(key);
    Ok(owned.into_boxed_str())
}

impl<V> KeyedStore<V> {
    /// Empty store without a release callback; values are simply dropped.
    pub fn new() -> Self {
        Self::with_capacity(0, None)
    }

    /// Empty store that calls `release` for every value it gives up.
    pub fn with_release<F>(release: F) -> Self
    where
        F: FnMut(Entry<'_, V>) + Send + 'static,
    {
        Self::with_capacity(0, Some(Box::new(release)))
    }

    pub fn with_capacity(capacity: usize, release: Option<ReleaseFn<V>>) -> Self {
        Self {
            tree: ArenaTree::with_capacity(capacity),
            release,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn has_release(&self) -> bool {
        self.release.is_some()
    }

    /// Insert `value` under `key`, replacing (and releasing) any previous value.
    ///
    /// The key is copied on first insert; an overwrite reuses the stored key.
    pub fn put(&mut self, key: &str, value: V) {
        if let Err(value) = self.replace_existing(key, value) {
            self.insert_new(Box::from(key), value);
        }
    }

    /// Like [`put`](Self::put), but a failed key allocation is reported
    /// instead of aborting. On error the store is unchanged and the value is
    /// returned inside the [`PutError`].
    pub fn try_put(&mut self, key: &str, value: V) -> Result<(), PutError<V>> {
        let value = match self.replace_existing(key, value) {
            Ok(()) => return Ok(()),
            Err(value) => value,
        };
        match copy_key(key) {
            Ok(owned) => {
                self.insert_new(owned, value);
                Ok(())
            }
            Err(source) => {
                warn!("key allocation of {} bytes failed: {}", key.len(), source);
                Err(PutError::new(
                    StoreError::KeyAlloc {
                        len: key.len(),
                        source,
                    },
                    value,
                ))
            }
        }
    }

    // Overwrites in place when `key` is present; hands `value` back otherwise.
    fn replace_existing(&mut self, key: &str, value: V) -> Result<(), V> {
        let Some(id) = self.tree.find(key) else {
            return Err(value);
        };
        if let Some(release) = self.release.as_mut() {
            let stored = id.key(&self.tree).expect("node found by lookup is live");
            let old = id.value(&self.tree).expect("node found by lookup is live");
            release(Entry::new(stored, old));
        }
        let slot = id
            .value_mut(&mut self.tree)
            .expect("node found by lookup is live");
        let old = core::mem::replace(slot, value);
        trace!("replaced value for key {:?}", key);
        drop(old);
        Ok(())
    }

    fn insert_new(&mut self, key: Box<str>, value: V) {
        trace!("inserting key {:?}", key);
        self.tree
            .insert(key, value)
            .expect("key was absent when checked");
    }

    /// `None` means absent; it never stands for a stored value.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.tree.get(key).map(|(_, v)| v)
    }

    /// Mutable access in place. The value stays owned by the store.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.tree.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tree.contains_key(key)
    }

    /// Remove `key` if present, releasing its value. Absent keys are a no-op.
    pub fn remove(&mut self, key: &str) {
        let Some((stored, value)) = self.tree.remove(key) else {
            return;
        };
        trace!("removed key {:?}", stored);
        notify(&mut self.release, &stored, &value);
    }

    /// Release every entry. The store stays usable.
    pub fn clear(&mut self) {
        if self.tree.is_empty() {
            return;
        }
        debug!("clearing {} entries", self.tree.len());
        let release = &mut self.release;
        for (key, value) in self.tree.drain() {
            notify(release, &key, &value);
        }
    }

    /// Visit every entry exactly once, in ascending key order.
    pub fn foreach<F>(&self, mut visit: F)
    where
        F: FnMut(Entry<'_, V>),
    {
        for entry in self.iter() {
            visit(entry);
        }
    }

    /// In-order iterator over entries.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            it: self.tree.iter(),
        }
    }

    pub fn keys(&self) -> Keys<'_, V> {
        Keys {
            it: self.tree.iter(),
        }
    }

    /// Release every entry and tear the store down. Dropping the store has
    /// the same effect.
    pub fn destroy(mut self) {
        debug!("destroying store with {} entries", self.tree.len());
        self.clear();
    }
}

impl<V> Drop for KeyedStore<V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V> Default for KeyedStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> Extend<(S, V)> for KeyedStore<V>
where
    S: AsRef<str>,
{
    fn extend<I: IntoIterator<Item = (S, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key.as_ref(), value);
        }
    }
}

impl<'a, V> IntoIterator for &'a KeyedStore<V> {
    type Item = Entry<'a, V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: fmt::Debug> fmt::Debug for KeyedStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entries<'a, V>(&'a KeyedStore<V>);
        impl<V: fmt::Debug> fmt::Debug for Entries<'_, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.0.iter().map(|e| (e.key, e.value)))
                    .finish()
            }
        }

        f.debug_struct("KeyedStore")
            .field("entries", &Entries(self))
            .field("release", &self.release.is_some())
            .finish()
    }
}

/// Iterator returned by [`KeyedStore::iter`].
pub struct Iter<'a, V> {
    it: arena_tree::Iter<'a, Box<str>, V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = Entry<'a, V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, k, v)| Entry::new(k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// Iterator returned by [`KeyedStore::keys`].
pub struct Keys<'a, V> {
    it: arena_tree::Iter<'a, Box<str>, V>,
}

impl<'a, V> Iterator for Keys<'a, V> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, k, _)| &**k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<V> ExactSizeIterator for Keys<'_, V> {}
impl<V> FusedIterator for Keys<'_, V> {}

//! keyed-store: a single-owner, string-keyed map over an arena-backed AVL
//! tree, with an optional callback that observes every value the map gives up.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a generic `KeyedStore<V>` whose ownership contract is easy to
//!   audit: each value is released exactly once, at a known point.
//! - Layers:
//!   - ArenaTree<K, V>: structural layer. AVL tree whose nodes live in a
//!     generational `SlotMap` and link to each other by arena key. Returns
//!     stable `NodeId` handles; includes a debug-only reentrancy guard.
//!   - KeyedStore<V>: public API over `ArenaTree<Box<str>, V>`. Copies keys
//!     on insert, overwrites in place, and routes every value it stops
//!     owning through the release callback before dropping it.
//!
//! Constraints
//! - Single owner: mutation takes `&mut self`; there is no internal locking.
//!   `KeyedStore<V>` is `Send` for `V: Send` and can be wrapped in a `Mutex`.
//! - Unique keys. An overwriting `put` reuses the stored key allocation.
//! - Lookups, inserts and removals are O(log n) worst case.
//!
//! Release points
//! - Overwrite: the callback sees the entry with the old value, then the new
//!   value takes the slot and the old one is dropped.
//! - `remove`: the node is unlinked and the tree rebalanced first, then the
//!   callback runs, then key and value are dropped.
//! - `clear`, `destroy` and `Drop`: every entry is detached, then released one
//!   by one in arena order.
//! - Without a callback the same points apply; `V: Drop` observes them.
//!
//! Reentrancy policy
//! - ArenaTree methods only invoke user code via `K: Ord`. The debug guard
//!   panics if that code calls back into the same tree.
//! - The release callback runs after the tree is consistent and holds no
//!   handle to the store, so it cannot observe a half-updated structure.
//!
//! Traversal
//! - `foreach`/`iter` walk the tree in order, so entries come out in
//!   ascending byte-wise key order. `clear` releases in arena order.
//!
//! Notes and non-goals
//! - No range queries, no persistence, no concurrent access.
//! - `get` returns `Option<&V>`; absence is never confused with a stored value.

pub mod arena_tree;
mod arena_tree_proptest;
pub mod error;
mod keyed_store;
mod reentrancy;

// Public surface
pub use error::{InsertError, PutError, StoreError};
pub use keyed_store::{Entry, Iter, KeyedStore, Keys, ReleaseFn};

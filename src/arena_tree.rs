//! ArenaTree: AVL search tree stored in a generational slot arena, with stable
//! node handles and a debug reentrancy guard.
//!
//! Nodes never move once inserted; parent/child links are arena keys. All
//! restructuring (rotations, successor splicing) happens on links only, so a
//! `NodeId` stays valid until its own entry is removed.

use crate::error::InsertError;
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::iter::FusedIterator;
use slotmap::{DefaultKey, SlotMap};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(DefaultKey);

impl NodeId {
    pub(crate) fn new(k: DefaultKey) -> Self {
        NodeId(k)
    }
    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, K, V>(&self, tree: &'a ArenaTree<K, V>) -> Option<&'a K>
    where
        K: Ord,
    {
        tree.node_key(*self)
    }

    pub fn value<'a, K, V>(&self, tree: &'a ArenaTree<K, V>) -> Option<&'a V>
    where
        K: Ord,
    {
        tree.node_value(*self)
    }

    pub fn value_mut<'a, K, V>(&self, tree: &'a mut ArenaTree<K, V>) -> Option<&'a mut V>
    where
        K: Ord,
    {
        tree.node_value_mut(*self)
    }
}

type Link = Option<DefaultKey>;
type Slots<K, V> = SlotMap<DefaultKey, Node<K, V>>;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    left: Link,
    right: Link,
    height: u8,
}

pub struct ArenaTree<K, V> {
    root: Link,
    slots: Slots<K, V>, // node storage; links are generational keys into it
    reentrancy: DebugReentrancy,
}

impl<K, V> ArenaTree<K, V>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            root: None,
            slots: SlotMap::with_capacity_and_key(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn locate<Q>(&self, q: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut at = self.root;
        while let Some(k) = at {
            let node = &self.slots[k];
            at = match q.cmp(node.key.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(k),
            };
        }
        None
    }

    pub fn find<Q>(&self, q: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.locate(q).map(NodeId::new)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.locate(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.locate(q).map(|k| {
            let node = &self.slots[k];
            (&node.key, &node.value)
        })
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        let k = self.locate(q)?;
        self.slots.get_mut(k).map(|n| &mut n.value)
    }

    /// Insert a new entry. Duplicates are rejected and the tree is left as is.
    pub fn insert(&mut self, key: K, value: V) -> Result<NodeId, InsertError> {
        let _g = self.reentrancy.enter();
        if self.locate(&key).is_some() {
            return Err(InsertError::DuplicateKey);
        }
        let k = self.slots.insert(Node {
            key,
            value,
            left: None,
            right: None,
            height: 1,
        });
        self.root = Some(link_node(&mut self.slots, self.root, k));
        Ok(NodeId::new(k))
    }

    /// Unlink the entry for `q` and hand it back.
    ///
    /// The tree is rebalanced and consistent before the pair is returned, so
    /// dropping `K`/`V` may reenter.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        let (root, removed) = unlink(&mut self.slots, self.root, q);
        let k = removed?;
        self.root = root;
        let node = self
            .slots
            .remove(k)
            .expect("unlinked node must still be in the arena");
        Some((node.key, node.value))
    }

    /// Detach every entry. The tree is empty as soon as this returns; pairs
    /// are yielded in arena order, not key order.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        let _g = self.reentrancy.enter();
        self.root = None;
        Drain {
            it: self.slots.drain(),
        }
    }

    pub(crate) fn node_key(&self, id: NodeId) -> Option<&K> {
        let _g = self.reentrancy.enter();
        self.slots.get(id.raw()).map(|n| &n.key)
    }

    pub(crate) fn node_value(&self, id: NodeId) -> Option<&V> {
        let _g = self.reentrancy.enter();
        self.slots.get(id.raw()).map(|n| &n.value)
    }

    pub(crate) fn node_value_mut(&mut self, id: NodeId) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        self.slots.get_mut(id.raw()).map(|n| &mut n.value)
    }

    /// In-order (ascending key) iteration.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.slots, self.root)
    }
}

impl<K, V> Default for ArenaTree<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

fn link_height<K, V>(slots: &Slots<K, V>, link: Link) -> u8 {
    link.map_or(0, |k| slots[k].height)
}

fn balance<K, V>(slots: &Slots<K, V>, k: DefaultKey) -> i16 {
    let node = &slots[k];
    i16::from(link_height(slots, node.left)) - i16::from(link_height(slots, node.right))
}

fn refresh<K, V>(slots: &mut Slots<K, V>, k: DefaultKey) {
    let (l, r) = (slots[k].left, slots[k].right);
    let h = 1 + link_height(slots, l).max(link_height(slots, r));
    slots[k].height = h;
}

fn rotate_right<K, V>(slots: &mut Slots<K, V>, y: DefaultKey) -> DefaultKey {
    let x = slots[y].left.expect("rotate_right needs a left child");
    let inner = slots[x].right;
    slots[y].left = inner;
    slots[x].right = Some(y);
    refresh(slots, y);
    refresh(slots, x);
    x
}

fn rotate_left<K, V>(slots: &mut Slots<K, V>, x: DefaultKey) -> DefaultKey {
    let y = slots[x].right.expect("rotate_left needs a right child");
    let inner = slots[y].left;
    slots[x].right = inner;
    slots[y].left = Some(x);
    refresh(slots, x);
    refresh(slots, y);
    y
}

/// Restore the AVL condition at `k` after one of its subtrees changed height
/// by at most one. Returns the new subtree root.
fn rebalance<K, V>(slots: &mut Slots<K, V>, k: DefaultKey) -> DefaultKey {
    refresh(slots, k);
    let bf = balance(slots, k);
    if bf > 1 {
        let l = slots[k].left.expect("left-heavy node has a left child");
        if balance(slots, l) < 0 {
            let nl = rotate_left(slots, l);
            slots[k].left = Some(nl);
        }
        return rotate_right(slots, k);
    }
    if bf < -1 {
        let r = slots[k].right.expect("right-heavy node has a right child");
        if balance(slots, r) > 0 {
            let nr = rotate_right(slots, r);
            slots[k].right = Some(nr);
        }
        return rotate_left(slots, k);
    }
    k
}

fn link_node<K: Ord, V>(slots: &mut Slots<K, V>, at: Link, new: DefaultKey) -> DefaultKey {
    let Some(k) = at else { return new };
    match slots[new].key.cmp(&slots[k].key) {
        Ordering::Less => {
            let left = slots[k].left;
            let sub = link_node(slots, left, new);
            slots[k].left = Some(sub);
        }
        Ordering::Greater => {
            let right = slots[k].right;
            let sub = link_node(slots, right, new);
            slots[k].right = Some(sub);
        }
        Ordering::Equal => unreachable!("duplicate keys are rejected before linking"),
    }
    rebalance(slots, k)
}

/// Returns the new subtree root and the unlinked node, if `q` was found.
/// A node with two children is replaced by its in-order successor.
fn unlink<K, V, Q>(slots: &mut Slots<K, V>, at: Link, q: &Q) -> (Link, Link)
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    let Some(k) = at else { return (None, None) };
    match q.cmp(slots[k].key.borrow()) {
        Ordering::Less => {
            let left = slots[k].left;
            let (sub, removed) = unlink(slots, left, q);
            if removed.is_none() {
                return (Some(k), None);
            }
            slots[k].left = sub;
            (Some(rebalance(slots, k)), removed)
        }
        Ordering::Greater => {
            let right = slots[k].right;
            let (sub, removed) = unlink(slots, right, q);
            if removed.is_none() {
                return (Some(k), None);
            }
            slots[k].right = sub;
            (Some(rebalance(slots, k)), removed)
        }
        Ordering::Equal => {
            let (left, right) = (slots[k].left, slots[k].right);
            let replacement = match (left, right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(_), Some(r)) => {
                    let (rest, succ) = detach_min(slots, r);
                    slots[succ].left = left;
                    slots[succ].right = rest;
                    Some(rebalance(slots, succ))
                }
            };
            (replacement, Some(k))
        }
    }
}

fn detach_min<K, V>(slots: &mut Slots<K, V>, k: DefaultKey) -> (Link, DefaultKey) {
    match slots[k].left {
        None => (slots[k].right, k),
        Some(l) => {
            let (rest, min) = detach_min(slots, l);
            slots[k].left = rest;
            (Some(rebalance(slots, k)), min)
        }
    }
}

/// In-order iterator over `ArenaTree`.
pub struct Iter<'a, K, V> {
    slots: &'a Slots<K, V>,
    stack: Vec<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(slots: &'a Slots<K, V>, root: Link) -> Self {
        let mut it = Self {
            slots,
            stack: Vec::new(),
            remaining: slots.len(),
        };
        it.descend_left(root);
        it
    }

    fn descend_left(&mut self, mut at: Link) {
        while let Some(k) = at {
            self.stack.push(k);
            at = self.slots[k].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (NodeId, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.stack.pop()?;
        let slots = self.slots;
        let node = &slots[k];
        self.descend_left(node.right);
        self.remaining -= 1;
        Some((NodeId::new(k), &node.key, &node.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Draining iterator returned by [`ArenaTree::drain`]. Dropping it early
/// still removes every entry.
pub struct Drain<'a, K, V> {
    it: slotmap::basic::Drain<'a, DefaultKey, Node<K, V>>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (n.key, n.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

#[cfg(test)]
impl<K, V> ArenaTree<K, V>
where
    K: Ord + core::fmt::Debug,
{
    /// Panics unless ordering, balance, stored heights and `len` all agree.
    pub(crate) fn assert_invariants(&self) {
        fn walk<'a, K: Ord + core::fmt::Debug, V>(
            slots: &'a Slots<K, V>,
            at: Link,
            lower: Option<&'a K>,
            upper: Option<&'a K>,
            seen: &mut usize,
        ) -> u8 {
            let Some(k) = at else { return 0 };
            *seen += 1;
            let node = &slots[k];
            if let Some(lo) = lower {
                assert!(lo < &node.key, "order violated: {:?} !< {:?}", lo, node.key);
            }
            if let Some(hi) = upper {
                assert!(&node.key < hi, "order violated: {:?} !< {:?}", node.key, hi);
            }
            let lh = walk(slots, node.left, lower, Some(&node.key), seen);
            let rh = walk(slots, node.right, Some(&node.key), upper, seen);
            assert!(
                (i16::from(lh) - i16::from(rh)).abs() <= 1,
                "unbalanced at {:?}: {} vs {}",
                node.key,
                lh,
                rh
            );
            let h = 1 + lh.max(rh);
            assert_eq!(node.height, h, "stale height at {:?}", node.key);
            h
        }

        let mut seen = 0;
        walk(&self.slots, self.root, None, None, &mut seen);
        assert_eq!(seen, self.slots.len(), "unreachable nodes in arena");
    }

    pub(crate) fn height(&self) -> u8 {
        link_height(&self.slots, self.root)
    }

    pub(crate) fn root_key(&self) -> Option<&K> {
        self.root.map(|k| &self.slots[k].key)
    }
}

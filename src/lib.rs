//! # avl-rs
//!
//! A thread-safe ordered map backed by an AVL tree.
//!
//! The tree engine keeps every node within one level of balance, so lookups,
//! inserts and removals are `O(log n)`. [`AvlTree`] wraps the engine behind a
//! single reader/writer lock: reads share it, writes take it exclusively, and
//! every public operation is one atomic step against the whole tree.
//!
//! ## Example
//!
//! ```rust
//! use avl_rs::{AvlTree, Entry};
//!
//! let tree: AvlTree<u32, &str> = AvlTree::new();
//! tree.store(5, "five");
//! tree.store(3, "three");
//! tree.store(8, "eight");
//!
//! assert_eq!(tree.load(&3), Some("three"));
//! assert_eq!(tree.first(), Some((3, "three")));
//! assert_eq!(tree.load_or_store(8, "ate"), Entry::Loaded("eight"));
//!
//! let mut keys = Vec::new();
//! tree.range(|k, _| {
//!     keys.push(*k);
//!     true
//! });
//! assert_eq!(keys, [3, 5, 8]);
//! ```
//!
//! ## Locking
//!
//! The lock covers the whole tree rather than individual paths, which keeps
//! rotations free of lock-ordering concerns at the cost of write concurrency.
//! Closures passed to [`AvlTree::range`], [`AvlTree::range_reverse`],
//! [`AvlTree::load_with`] and [`AvlTree::load_or_store_with`] run with the
//! lock held and must not call back into the same tree's mutating methods.
//! Read-only calls from inside them are fine: shared acquisitions are
//! recursive and do not queue behind a waiting writer.

#![deny(unsafe_code)]

mod error;
mod node;

pub use error::{AvlError, Result};

use std::borrow::Borrow;
use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, trace};

use node::Link;

struct Root<K, V> {
    link: Link<K, V>,
    /// Number of live nodes reachable from `link`.
    len: usize,
}

/// Outcome of [`AvlTree::load_or_store`] and [`AvlTree::load_or_store_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<V> {
    /// The key was present; holds the existing value. The tree is unchanged.
    Loaded(V),
    /// The key was absent; holds the value that was just stored.
    Stored(V),
}

impl<V> Entry<V> {
    /// Whether the key was already present.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Entry::Loaded(_))
    }

    /// The loaded or stored value.
    #[inline]
    pub fn value(&self) -> &V {
        match self {
            Entry::Loaded(v) | Entry::Stored(v) => v,
        }
    }

    /// Unwraps the loaded or stored value.
    #[inline]
    pub fn into_value(self) -> V {
        match self {
            Entry::Loaded(v) | Entry::Stored(v) => v,
        }
    }
}

/// A concurrent ordered map built on an AVL tree.
///
/// Keys are ordered by [`Ord`]; lookups accept any borrowed form of the key,
/// as with [`std::collections::BTreeMap`]. Values are returned by clone since
/// no reference can outlive the lock; use [`AvlTree::load_with`] to inspect a
/// value in place.
pub struct AvlTree<K, V> {
    inner: RwLock<Root<K, V>>,
}

impl<K, V> AvlTree<K, V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Root { link: None, len: 0 }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read_recursive().len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Height of the tree: 0 when empty, 1 for a single entry.
    pub fn height(&self) -> u32 {
        node::height(&self.inner.read_recursive().link)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let old = {
            let mut root = self.inner.write();
            root.len = 0;
            root.link.take()
        };
        // Drop the nodes outside the critical section.
        drop(old);
        debug!("cleared tree");
    }

    /// Visits every entry in ascending key order until `visit` returns `false`.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let root = self.inner.read_recursive();
        node::walk(&root.link, &mut visit);
    }

    /// Visits every entry in descending key order until `visit` returns `false`.
    pub fn range_reverse<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let root = self.inner.read_recursive();
        node::walk_rev(&root.link, &mut visit);
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Inserts or overwrites `key`. Returns the previous value, if any.
    pub fn store(&self, key: K, value: V) -> Option<V> {
        let mut root = self.inner.write();
        let replaced = node::insert(&mut root.link, key, value);
        if replaced.is_none() {
            root.len += 1;
        }
        trace!(len = root.len, overwrite = replaced.is_some(), "store");
        replaced
    }

    /// Inserts `key` only if it is absent.
    ///
    /// Fails with [`AvlError::KeyExists`] and leaves the stored value alone
    /// when the key is already present.
    pub fn try_insert(&self, key: K, value: V) -> Result<()> {
        let mut root = self.inner.write();
        // Two descents, both under the same write guard.
        if node::find(&root.link, &key).is_some() {
            return Err(AvlError::KeyExists);
        }
        node::insert(&mut root.link, key, value);
        root.len += 1;
        trace!(len = root.len, "try_insert");
        Ok(())
    }

    /// Whether `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        node::find(&self.inner.read_recursive().link, key).is_some()
    }

    /// Runs `f` on the value stored under `key` while holding the read lock.
    pub fn load_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&V) -> R,
    {
        let root = self.inner.read_recursive();
        node::find(&root.link, key).map(|n| f(&n.value))
    }

    /// Removes `key` and returns its value, in one exclusive step.
    pub fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut root = self.inner.write();
        let removed = node::remove(&mut root.link, key);
        if removed.is_some() {
            root.len -= 1;
            trace!(len = root.len, "delete");
        }
        removed
    }

    /// Removes `key`. Returns whether it was present; an absent key is a no-op.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.load_and_delete(key).is_some()
    }

    /// Removes `key`, failing with [`AvlError::NotFound`] if it is absent.
    pub fn try_remove<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.load_and_delete(key).ok_or(AvlError::NotFound)
    }
}

impl<K: Ord, V: Clone> AvlTree<K, V> {
    /// Returns a clone of the value stored under `key`.
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.load_with(key, V::clone)
    }

    /// Like [`AvlTree::load`], but reports absence as [`AvlError::NotFound`].
    pub fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.load(key).ok_or(AvlError::NotFound)
    }

    /// Returns the existing value for `key`, or stores `value` if absent.
    ///
    /// Lookup and insert happen under one write lock, so among concurrent
    /// callers racing on the same absent key exactly one sees
    /// [`Entry::Stored`].
    pub fn load_or_store(&self, key: K, value: V) -> Entry<V> {
        self.load_or_store_with(key, || value)
    }

    /// Like [`AvlTree::load_or_store`], but only builds the value when the key
    /// is confirmed absent. `create` runs at most once, under the write lock.
    pub fn load_or_store_with<F>(&self, key: K, create: F) -> Entry<V>
    where
        F: FnOnce() -> V,
    {
        let mut root = self.inner.write();
        if let Some(existing) = node::find(&root.link, &key) {
            return Entry::Loaded(existing.value.clone());
        }
        let value = create();
        node::insert(&mut root.link, key, value.clone());
        root.len += 1;
        trace!(len = root.len, "load_or_store");
        Entry::Stored(value)
    }
}

impl<K: Clone, V: Clone> AvlTree<K, V> {
    /// Smallest key and its value.
    pub fn first(&self) -> Option<(K, V)> {
        let root = self.inner.read_recursive();
        node::first(&root.link).map(|n| (n.key.clone(), n.value.clone()))
    }

    /// Largest key and its value.
    pub fn last(&self) -> Option<(K, V)> {
        let root = self.inner.read_recursive();
        node::last(&root.link).map(|n| (n.key.clone(), n.value.clone()))
    }
}

impl<K, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlTree<K, V> {
    fn clone(&self) -> Self {
        let root = self.inner.read_recursive();
        Self {
            inner: RwLock::new(Root {
                link: root.link.clone(),
                len: root.len,
            }),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        self.range(|k, v| {
            map.entry(k, v);
            true
        });
        map.finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let root = self.inner.get_mut();
        for (key, value) in iter {
            if node::insert(&mut root.link, key, value).is_none() {
                root.len += 1;
            }
        }
    }
}


#[cfg(test)]
mod proptests;

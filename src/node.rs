//! AVL engine: nodes, rotations, and the slot-based recursive algorithms.
//!
//! Every function here takes a [`Link`], the child slot of a parent (or the
//! tree root), so that rebalancing can replace the subtree hanging off that
//! slot in place. Nothing in this module is synchronized; [`AvlTree`](crate::AvlTree)
//! owns the lock.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;

use tracing::trace;

/// An exclusively owned child edge. `None` is an empty subtree.
pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// Height of the subtree rooted here. A leaf is 1.
    height: u32,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        }
    }

    #[inline]
    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }
}

#[inline]
pub(crate) fn height<K, V>(link: &Link<K, V>) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

// =============================================================================
// Rotations
// =============================================================================

//      a              b
//     / \            / \
//    x   b    =>    a   z
//       / \        / \
//      y   z      x   y
fn rotate_left<K, V>(slot: &mut Link<K, V>) {
    let Some(mut root) = slot.take() else {
        return;
    };
    let Some(mut pivot) = root.right.take() else {
        *slot = Some(root);
        return;
    };
    trace!(direction = "left", "rotate");

    root.right = pivot.left.take();
    root.update_height();
    pivot.left = Some(root);
    pivot.update_height();
    *slot = Some(pivot);
}

//        a          b
//       / \        / \
//      b   z  =>  x   a
//     / \            / \
//    x   y          y   z
fn rotate_right<K, V>(slot: &mut Link<K, V>) {
    let Some(mut root) = slot.take() else {
        return;
    };
    let Some(mut pivot) = root.left.take() else {
        *slot = Some(root);
        return;
    };
    trace!(direction = "right", "rotate");

    root.left = pivot.right.take();
    root.update_height();
    pivot.right = Some(root);
    pivot.update_height();
    *slot = Some(pivot);
}

/// Restores the AVL invariant at `slot`, assuming both subtrees already
/// satisfy it and differ in height by at most 2.
fn balance<K, V>(slot: &mut Link<K, V>) {
    let Some(node) = slot.as_deref_mut() else {
        return;
    };
    let (left_h, right_h) = (height(&node.left), height(&node.right));
    if left_h.abs_diff(right_h) <= 1 {
        return;
    }

    if left_h > right_h {
        // Zig-zag: straighten the left child first.
        if node
            .left
            .as_ref()
            .is_some_and(|left| height(&left.left) < height(&left.right))
        {
            rotate_left(&mut node.left);
        }
        rotate_right(slot);
    } else {
        if node
            .right
            .as_ref()
            .is_some_and(|right| height(&right.left) > height(&right.right))
        {
            rotate_right(&mut node.right);
        }
        rotate_left(slot);
    }
}

/// Recomputes the cached height at `slot`, then rebalances it.
#[inline]
fn fixup<K, V>(slot: &mut Link<K, V>) {
    if let Some(node) = slot.as_deref_mut() {
        node.update_height();
    }
    balance(slot);
}

// =============================================================================
// Insert / find
// =============================================================================

/// Inserts `key`, overwriting the value in place if it is already present.
///
/// Returns the replaced value. The shape of the tree only changes (and is
/// only rebalanced) when a new node was created.
pub(crate) fn insert<K: Ord, V>(slot: &mut Link<K, V>, key: K, value: V) -> Option<V> {
    let Some(node) = slot.as_deref_mut() else {
        *slot = Some(Box::new(Node::leaf(key, value)));
        return None;
    };

    let replaced = match key.cmp(&node.key) {
        Ordering::Less => insert(&mut node.left, key, value),
        Ordering::Greater => insert(&mut node.right, key, value),
        Ordering::Equal => return Some(mem::replace(&mut node.value, value)),
    };
    if replaced.is_none() {
        fixup(slot);
    }
    replaced
}

pub(crate) fn find<'a, K, V, Q>(mut link: &'a Link<K, V>, key: &Q) -> Option<&'a Node<K, V>>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    while let Some(node) = link {
        link = match key.cmp(node.key.borrow()) {
            Ordering::Less => &node.left,
            Ordering::Greater => &node.right,
            Ordering::Equal => return Some(&**node),
        };
    }
    None
}

pub(crate) fn first<K, V>(link: &Link<K, V>) -> Option<&Node<K, V>> {
    let mut node = link.as_deref()?;
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    Some(node)
}

pub(crate) fn last<K, V>(link: &Link<K, V>) -> Option<&Node<K, V>> {
    let mut node = link.as_deref()?;
    while let Some(right) = node.right.as_deref() {
        node = right;
    }
    Some(node)
}

// =============================================================================
// Remove
// =============================================================================

/// Removes `key` and returns its value. An absent key leaves the tree as is.
pub(crate) fn remove<K, V, Q>(slot: &mut Link<K, V>, key: &Q) -> Option<V>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let node = slot.as_deref_mut()?;
    let removed = match key.cmp(node.key.borrow()) {
        Ordering::Less => remove(&mut node.left, key)?,
        Ordering::Greater => remove(&mut node.right, key)?,
        Ordering::Equal => unlink(slot)?,
    };
    fixup(slot);
    Some(removed)
}

/// Detaches the node at `slot` and splices a replacement into its place.
///
/// With two children the heir comes from the taller side: the in-order
/// predecessor when the left subtree is strictly taller, otherwise the
/// successor. The caller fixes up `slot` afterwards.
fn unlink<K, V>(slot: &mut Link<K, V>) -> Option<V> {
    let mut node = slot.take()?;
    *slot = match (node.left.take(), node.right.take()) {
        (None, None) => None,
        (Some(child), None) | (None, Some(child)) => Some(child),
        (mut left, mut right) => {
            let heir = if height(&left) > height(&right) {
                pop_last(&mut left)
            } else {
                pop_first(&mut right)
            };
            match heir {
                Some(mut heir) => {
                    heir.left = left;
                    heir.right = right;
                    Some(heir)
                }
                None => left.or(right),
            }
        }
    };
    let Node { value, .. } = *node;
    Some(value)
}

/// Detaches the left-most node under `slot`, rebalancing every ancestor on
/// the way back up.
fn pop_first<K, V>(slot: &mut Link<K, V>) -> Link<K, V> {
    let node = slot.as_deref_mut()?;
    if node.left.is_some() {
        let first = pop_first(&mut node.left);
        fixup(slot);
        return first;
    }
    let mut first = slot.take()?;
    *slot = first.right.take();
    Some(first)
}

/// Detaches the right-most node under `slot`, rebalancing every ancestor on
/// the way back up.
fn pop_last<K, V>(slot: &mut Link<K, V>) -> Link<K, V> {
    let node = slot.as_deref_mut()?;
    if node.right.is_some() {
        let last = pop_last(&mut node.right);
        fixup(slot);
        return last;
    }
    let mut last = slot.take()?;
    *slot = last.left.take();
    Some(last)
}

// =============================================================================
// Traversal
// =============================================================================

/// In-order walk. Returns `false` as soon as `visit` does, without touching
/// any further node.
pub(crate) fn walk<K, V, F>(link: &Link<K, V>, visit: &mut F) -> bool
where
    F: FnMut(&K, &V) -> bool,
{
    let Some(node) = link.as_deref() else {
        return true;
    };
    walk(&node.left, visit) && visit(&node.key, &node.value) && walk(&node.right, visit)
}

/// Reverse in-order walk, with the same early stop as [`walk`].
pub(crate) fn walk_rev<K, V, F>(link: &Link<K, V>, visit: &mut F) -> bool
where
    F: FnMut(&K, &V) -> bool,
{
    let Some(node) = link.as_deref() else {
        return true;
    };
    walk_rev(&node.right, visit) && visit(&node.key, &node.value) && walk_rev(&node.left, visit)
}

/// Checks ordering, balance and cached heights of the whole subtree and
/// returns its height.
#[cfg(test)]
pub(crate) fn validate<K: Ord + std::fmt::Debug, V>(link: &Link<K, V>) -> u32 {
    fn rec<'a, K: Ord + std::fmt::Debug, V>(
        link: &'a Link<K, V>,
        lower: Option<&'a K>,
        upper: Option<&'a K>,
    ) -> u32 {
        let Some(node) = link.as_deref() else {
            return 0;
        };
        if let Some(lower) = lower {
            assert!(lower < &node.key, "{lower:?} must sort before {:?}", node.key);
        }
        if let Some(upper) = upper {
            assert!(&node.key < upper, "{:?} must sort before {upper:?}", node.key);
        }

        let left_h = rec(&node.left, lower, Some(&node.key));
        let right_h = rec(&node.right, Some(&node.key), upper);
        assert!(
            left_h.abs_diff(right_h) <= 1,
            "unbalanced at {:?}: left {left_h}, right {right_h}",
            node.key
        );
        assert_eq!(
            node.height,
            1 + left_h.max(right_h),
            "stale height at {:?}",
            node.key
        );
        node.height
    }

    rec(link, None, None)
}

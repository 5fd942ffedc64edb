//! Hazard pointer reclamation shared by both containers.
//!
//! A node unlinked from a container is retired into [`CONTAINERS`] and only
//! freed once no [`HazardPointer`] names it. Every thread that dereferences a
//! node it did not allocate holds a hazard on it first, which also rules out
//! ABA on `head`: a protected node cannot be freed and handed out again.

use crate::node::{DropNode, Node};
use crate::Link;
use core::ptr::NonNull;
use core::sync::atomic::{fence, Ordering};
use haphazard::{Domain, HazardPointer, Singleton};

pub(crate) struct Family;

unsafe impl Singleton for Family {}

pub(crate) static CONTAINERS: Domain<Family> = Domain::new(&Family);

pub(crate) fn hazard() -> HazardPointer<'static, Family> {
    HazardPointer::new_in_domain(&CONTAINERS)
}

/// Protects the node currently stored in `link`.
///
/// Returns the protected pointer, which is null if `link` was empty when the
/// protection became visible.
pub(crate) fn protect<V>(hazard: &mut HazardPointer<'_, Family>, link: &Link<Node<V>>) -> *mut Node<V> {
    let mut ptr = link.load_ptr();

    loop {
        hazard.protect_raw(ptr);
        fence(Ordering::SeqCst);

        let now = link.load_ptr();

        if core::ptr::eq(ptr, now) {
            return ptr;
        }

        ptr = now;
    }
}

/// Protects `next`, read from the node `head` currently points at.
///
/// `next` can only have been retired after `head` moved past `at`, so the
/// protection holds iff `head` still points at `at` once it is published.
pub(crate) fn protect_successor<V>(
    hazard: &mut HazardPointer<'_, Family>,
    next: *mut Node<V>,
    head: &Link<Node<V>>,
    at: *mut Node<V>,
) -> bool {
    hazard.protect_raw(next);
    fence(Ordering::SeqCst);

    if core::ptr::eq(head.load_ptr(), at) {
        true
    } else {
        hazard.reset_protection();
        false
    }
}

/// Hands an unlinked node to the domain.
///
/// # Safety
///
/// `node` must no longer be reachable from any container, and must be
/// retired at most once. The domain is process wide and may drop the value
/// after the container is gone, hence `'static`.
pub(crate) unsafe fn retire<V: Send + 'static>(node: *mut Node<V>) {
    CONTAINERS.retire_ptr::<_, DropNode<_>>(node);
}

/// A protected view of an element that is still in its container, as
/// returned by `peek`.
///
/// The element may be removed by another thread while this is held; the
/// value stays readable until the `NodeRef` is dropped.
pub struct NodeRef<'a, V> {
    node: NonNull<Node<V>>,
    _hazard: HazardPointer<'a, Family>,
}

impl<'a, V> NodeRef<'a, V> {
    /// `node` must carry a value and be protected by `hazard`.
    pub(crate) fn new(node: *mut Node<V>, hazard: HazardPointer<'a, Family>) -> Self {
        debug_assert!(!node.is_null());

        NodeRef {
            node: unsafe { NonNull::new_unchecked(node) },
            _hazard: hazard,
        }
    }
}

impl<'a, V> core::ops::Deref for NodeRef<'a, V> {
    type Target = V;
    fn deref(&self) -> &Self::Target {
        value(&self.node)
    }
}

impl<'a, V: core::fmt::Debug> core::fmt::Debug for NodeRef<'a, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("NodeRef").field(&**self).finish()
    }
}

/// An element removed by `pop` or `dequeue`.
///
/// A popped stack node is freed, and its value dropped, some time after the
/// `Entry` goes away. A dequeued queue node lives on as the placeholder; see
/// [`Queue::dequeue`](crate::Queue::dequeue).
pub struct Entry<'a, V> {
    node: NonNull<Node<V>>,
    hazard: HazardPointer<'a, Family>,
}

impl<'a, V> Entry<'a, V> {
    /// `node` must carry a value and be protected by `hazard`.
    pub(crate) fn new(node: *mut Node<V>, hazard: HazardPointer<'a, Family>) -> Self {
        debug_assert!(!node.is_null());

        Entry {
            node: unsafe { NonNull::new_unchecked(node) },
            hazard,
        }
    }
}

impl<'a, V> core::ops::Deref for Entry<'a, V> {
    type Target = V;
    fn deref(&self) -> &Self::Target {
        value(&self.node)
    }
}

impl<'a, V> Drop for Entry<'a, V> {
    fn drop(&mut self) {
        self.hazard.reset_protection();
        CONTAINERS.eager_reclaim();
    }
}

impl<'a, V: core::fmt::Debug> core::fmt::Debug for Entry<'a, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Entry").field(&**self).finish()
    }
}

fn value<V>(node: &NonNull<Node<V>>) -> &V {
    match unsafe { &node.as_ref().val } {
        Some(val) => val,
        None => unreachable!("placeholder node handed out"),
    }
}

//! Treiber stack.

use crate::node::Node;
use crate::reclaim::{self, Entry, NodeRef};
use crate::Link;
use core::marker::PhantomData;
use core::ptr::null_mut;
use core::sync::atomic::{AtomicUsize, Ordering};
use crossbeam_utils::Backoff;

/// A lock free LIFO stack.
///
/// `head` points at the most recently pushed node that has not been popped,
/// and the chain behind it holds the rest of the stack in LIFO order.
///
/// Popped nodes may be freed after the stack itself is gone, so values must
/// not borrow anything:
///
/// ```compile_fail
/// let name = String::from("borrowed");
/// let stack = lflist::Stack::new();
/// stack.push(name.as_str());
/// drop(stack);
/// drop(name);
/// ```
pub struct Stack<V> {
    head: Link<Node<V>>,
    len: AtomicUsize,
    _marker: PhantomData<V>,
}

unsafe impl<V: Send> Send for Stack<V> {}
unsafe impl<V: Send + Sync> Sync for Stack<V> {}

impl<V> Stack<V> {
    pub fn new() -> Self {
        Stack {
            head: Link::new(null_mut()),
            len: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }

    /// Number of elements, updated separately from the structural change
    /// and therefore only approximate under concurrent use.
    pub fn len(&self) -> usize {
        crate::approximate_len(self.len.load(Ordering::Relaxed))
    }

    pub fn is_empty(&self) -> bool {
        self.head.load_ptr().is_null()
    }

    /// Unlinks the top node of an exclusively owned stack.
    fn take_head(&mut self) -> Option<V> {
        let head = *self.head.get_mut();

        if head.is_null() {
            return None;
        }

        unsafe {
            *self.head.get_mut() = (*head).next.load_ptr();
            let len = self.len.get_mut();
            *len = len.wrapping_sub(1);
            Node::into_val(head)
        }
    }
}

impl<V> Stack<V>
where
    V: Send + Sync + 'static,
{
    pub fn push(&self, val: V) {
        let node = Node::new(Some(val));
        let backoff = Backoff::new();

        let mut head = self.head.load_ptr();

        unsafe {
            (*node).next.store_ptr(head);
        }

        while let Err(now) =
            self.head
                .compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire)
        {
            trace_retry!("stack.push");
            backoff.spin();

            head = now;
            unsafe {
                (*node).next.store_ptr(head);
            }
        }

        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes the top element, or returns `None` if the stack was empty.
    pub fn pop(&self) -> Option<Entry<'_, V>> {
        let mut hazard = reclaim::hazard();
        let backoff = Backoff::new();

        loop {
            let head = reclaim::protect(&mut hazard, &self.head);

            if head.is_null() {
                return None;
            }

            let next = unsafe { (*head).next.load_ptr() };

            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);

                unsafe {
                    reclaim::retire(head);
                }

                return Some(Entry::new(head, hazard));
            }

            trace_retry!("stack.pop");
            backoff.spin();
        }
    }

    /// Returns the top element without removing it.
    ///
    /// A concurrent `pop` may remove the element while the returned
    /// reference is held.
    pub fn peek(&self) -> Option<NodeRef<'_, V>> {
        let mut hazard = reclaim::hazard();
        let head = reclaim::protect(&mut hazard, &self.head);

        if head.is_null() {
            None
        } else {
            Some(NodeRef::new(head, hazard))
        }
    }

    /// Pushes all of `other` on top of this stack with a single CAS,
    /// keeping `other`'s order.
    pub fn append(&self, mut other: Self) {
        let new_head = core::mem::replace(other.head.get_mut(), null_mut());

        if new_head.is_null() {
            return;
        }

        let mut count = 1;
        let mut tail = new_head;
        unsafe {
            while !(*tail).next.load_ptr().is_null() {
                tail = (*tail).next.load_ptr();
                count += 1;
            }
        }
        *other.len.get_mut() = 0;

        #[cfg(feature = "tracing")]
        tracing::debug!(count, "appending to stack");

        let backoff = Backoff::new();
        let mut old_head = self.head.load_ptr();

        unsafe {
            (*tail).next.store_ptr(old_head);
        }

        while let Err(now) =
            self.head
                .compare_exchange(old_head, new_head, Ordering::AcqRel, Ordering::Acquire)
        {
            trace_retry!("stack.append");
            backoff.spin();

            old_head = now;
            unsafe {
                (*tail).next.store_ptr(old_head);
            }
        }

        self.len.fetch_add(count, Ordering::Relaxed);
    }
}

impl<V> Default for Stack<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> core::fmt::Debug for Stack<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stack")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<V> Drop for Stack<V> {
    fn drop(&mut self) {
        unsafe {
            Node::drop_chain(*self.head.get_mut());
        }
    }
}

impl<V: Send + Sync + 'static> Extend<V> for Stack<V> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        iter.into_iter().for_each(|val| self.push(val));
    }
}

impl<V: Send + Sync + 'static> FromIterator<V> for Stack<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut stack = Stack::new();
        stack.extend(iter);
        stack
    }
}

impl<V> IntoIterator for Stack<V> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { stack: self }
    }
}

/// Owning iterator over a [`Stack`], yielding values in pop order.
pub struct IntoIter<V> {
    stack: Stack<V>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.take_head()
    }
}

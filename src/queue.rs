//! FIFO queue with a single-CAS enqueue.
//!
//! `head` always points at a placeholder node whose `next` is the first
//! element. `tail` points at the most recently enqueued node, which may not
//! be linked behind its predecessor yet: an enqueue first swings `tail` to its
//! node with a CAS, and only then stores the `next` of the node it replaced.
//! Winning the CAS against a given `tail` makes a thread the only writer of
//! that node's `next`, so the link needs no second CAS.
//!
//! Between those two steps the new node is reachable from `tail` but not from
//! `head`, and a racing `dequeue` may report an empty queue. No value is lost
//! or duplicated by this; it becomes visible as soon as the link is stored.

use crate::node::Node;
use crate::reclaim::{self, Entry, NodeRef};
use crate::Link;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};
use crossbeam_utils::{Backoff, CachePadded};

/// A lock free FIFO queue.
///
/// Dequeued nodes may be freed after the queue itself is gone, so values
/// must not borrow anything:
///
/// ```compile_fail
/// let name = String::from("borrowed");
/// let queue = lflist::Queue::new();
/// queue.enqueue(name.as_str());
/// drop(queue);
/// drop(name);
/// ```
pub struct Queue<V> {
    head: CachePadded<Link<Node<V>>>,
    tail: CachePadded<Link<Node<V>>>,
    len: AtomicUsize,
    _marker: PhantomData<V>,
}

unsafe impl<V: Send> Send for Queue<V> {}
unsafe impl<V: Send + Sync> Sync for Queue<V> {}

impl<V> Queue<V> {
    pub fn new() -> Self {
        let placeholder = Node::new(None);

        Queue {
            head: CachePadded::new(Link::new(placeholder)),
            tail: CachePadded::new(Link::new(placeholder)),
            len: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }

    /// Number of elements, updated separately from the structural change
    /// and therefore only approximate under concurrent use.
    pub fn len(&self) -> usize {
        crate::approximate_len(self.len.load(Ordering::Relaxed))
    }

    /// Whether no element is reachable from `head`. An enqueue that has
    /// claimed `tail` but not linked its node yet is not counted.
    pub fn is_empty(&self) -> bool {
        let mut hazard = reclaim::hazard();
        let head = reclaim::protect(&mut hazard, &*self.head);

        unsafe { (*head).next.load_ptr().is_null() }
    }

    /// Swings `tail` to `node`, returning the node it replaced.
    ///
    /// The returned node is not dereferenced before the CAS succeeds, and it
    /// cannot be retired until the caller links it, so it needs no hazard.
    fn claim_tail(&self, node: *mut Node<V>) -> *mut Node<V> {
        let backoff = Backoff::new();
        let mut tail = self.tail.load_ptr();

        while let Err(now) =
            self.tail
                .compare_exchange(tail, node, Ordering::AcqRel, Ordering::Acquire)
        {
            trace_retry!("queue.enqueue");
            backoff.spin();

            tail = now;
        }

        tail
    }

    /// Links `first` behind `prev`, a node returned by `claim_tail`.
    unsafe fn link(prev: *mut Node<V>, first: *mut Node<V>) {
        (*prev).next.store_ptr(first);
    }

    /// Unlinks the first element of an exclusively owned queue.
    fn take_first(&mut self) -> Option<V> {
        let head = *self.head.get_mut();

        unsafe {
            let next = (*head).next.load_ptr();

            if next.is_null() {
                return None;
            }

            *self.head.get_mut() = next;
            let len = self.len.get_mut();
            *len = len.wrapping_sub(1);

            // `next` becomes the placeholder.
            let val = (*next).val.take();
            Node::drop(head);
            val
        }
    }
}

impl<V> Queue<V>
where
    V: Send + Sync + 'static,
{
    pub fn enqueue(&self, val: V) {
        let node = Node::new(Some(val));

        let prev = self.claim_tail(node);

        unsafe {
            Self::link(prev, node);
        }

        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes the first element, or returns `None` if no element was
    /// linked behind the placeholder.
    ///
    /// The removed node becomes the new placeholder, so its value is only
    /// dropped once a later `dequeue` retires that node, or when the queue is
    /// dropped. Dropping the returned [`Entry`] alone does not release it.
    pub fn dequeue(&self) -> Option<Entry<'_, V>> {
        let mut head_hazard = reclaim::hazard();
        let mut next_hazard = reclaim::hazard();
        let backoff = Backoff::new();

        loop {
            let head = reclaim::protect(&mut head_hazard, &*self.head);
            let next = unsafe { (*head).next.load_ptr() };

            if next.is_null() {
                return None;
            }

            if reclaim::protect_successor(&mut next_hazard, next, &*self.head, head)
                && self
                    .head
                    .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);

                // `next` is the placeholder now; its value stays in place
                // until the node itself is reclaimed.
                unsafe {
                    reclaim::retire(head);
                }

                return Some(Entry::new(next, next_hazard));
            }

            trace_retry!("queue.dequeue");
            backoff.spin();
        }
    }

    /// Returns the first element without removing it.
    ///
    /// A concurrent `dequeue` may remove the element while the returned
    /// reference is held.
    pub fn peek(&self) -> Option<NodeRef<'_, V>> {
        let mut head_hazard = reclaim::hazard();
        let mut next_hazard = reclaim::hazard();

        loop {
            let head = reclaim::protect(&mut head_hazard, &*self.head);
            let next = unsafe { (*head).next.load_ptr() };

            if next.is_null() {
                return None;
            }

            if reclaim::protect_successor(&mut next_hazard, next, &*self.head, head) {
                return Some(NodeRef::new(next, next_hazard));
            }
        }
    }

    /// Enqueues all of `other` behind the current tail with a single CAS,
    /// keeping `other`'s order.
    pub fn append(&self, mut other: Self) {
        let placeholder = *other.head.get_mut();

        let first = unsafe { (*placeholder).next.load_ptr() };

        if first.is_null() {
            return;
        }

        let last = core::mem::replace(other.tail.get_mut(), placeholder);

        let mut count = 1;
        let mut curr = first;
        unsafe {
            (*placeholder).next.store_ptr(core::ptr::null_mut());

            while !core::ptr::eq(curr, last) {
                curr = (*curr).next.load_ptr();
                count += 1;
            }
        }
        *other.len.get_mut() = 0;

        #[cfg(feature = "tracing")]
        tracing::debug!(count, "appending to queue");

        let prev = self.claim_tail(last);

        unsafe {
            Self::link(prev, first);
        }

        self.len.fetch_add(count, Ordering::Relaxed);
    }
}

impl<V> Default for Queue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> core::fmt::Debug for Queue<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Queue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<V> Drop for Queue<V> {
    fn drop(&mut self) {
        unsafe {
            Node::drop_chain(*self.head.get_mut());
        }
    }
}

impl<V: Send + Sync + 'static> Extend<V> for Queue<V> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        iter.into_iter().for_each(|val| self.enqueue(val));
    }
}

impl<V: Send + Sync + 'static> FromIterator<V> for Queue<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut queue = Queue::new();
        queue.extend(iter);
        queue
    }
}

impl<V> IntoIterator for Queue<V> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { queue: self }
    }
}

/// Owning iterator over a [`Queue`], yielding values in FIFO order.
pub struct IntoIter<V> {
    queue: Queue<V>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.take_first()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty() {
        let queue = Queue::<i32>::new();

        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
        assert!(queue.peek().is_none());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_enqueue() {
        let queue = Queue::new();

        queue.enqueue("test");

        let placeholder = queue.head.load_ptr();
        let first = unsafe { (*placeholder).next.load_ptr() };
        assert_eq!(unsafe { (*first).val }, Some("test"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_fifo() {
        let queue = Queue::new();

        (0..100).for_each(|i| queue.enqueue(i));

        for i in 0..100 {
            assert_eq!(queue.dequeue().map(|e| *e), Some(i));
        }
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_len() {
        let queue = Queue::new();

        for i in 0..10 {
            queue.enqueue(i);
            assert_eq!(queue.len(), i + 1);
        }

        for i in (0..10).rev() {
            queue.dequeue();
            assert_eq!(queue.len(), i);
        }
    }

    #[test]
    fn test_peek_does_not_remove() {
        let queue = Queue::new();

        queue.enqueue("a");
        queue.enqueue("b");

        for _ in 0..5 {
            assert_eq!(queue.peek().map(|e| *e), Some("a"));
        }

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue().map(|e| *e), Some("a"));
        assert_eq!(queue.peek().map(|e| *e), Some("b"));
    }

    #[test]
    fn test_entry_outlives_next_dequeue() {
        let queue = Queue::new();

        queue.enqueue(String::from("first"));
        queue.enqueue(String::from("second"));

        let first = queue.dequeue().unwrap();
        let second = queue.dequeue().unwrap();

        assert_eq!(*first, "first");
        assert_eq!(*second, "second");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_claimed_but_unlinked_is_invisible() {
        let queue = Queue::new();

        queue.enqueue(1);

        let node = Node::new(Some(2));
        let prev = queue.claim_tail(node);

        assert_eq!(queue.dequeue().map(|e| *e), Some(1));
        assert!(queue.dequeue().is_none());
        assert!(queue.peek().is_none());

        unsafe {
            Queue::link(prev, node);
        }
        queue.len.fetch_add(1, Ordering::Relaxed);

        assert_eq!(queue.peek().map(|e| *e), Some(2));
        assert_eq!(queue.dequeue().map(|e| *e), Some(2));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_enqueue_behind_unlinked_tail() {
        let queue = Queue::new();

        let node = Node::new(Some(1));
        let prev = queue.claim_tail(node);

        queue.enqueue(2);
        assert!(queue.dequeue().is_none());

        unsafe {
            Queue::link(prev, node);
        }
        queue.len.fetch_add(1, Ordering::Relaxed);

        assert_eq!(queue.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_dequeued_value_lives_in_placeholder() {
        let first = Arc::new(1);
        let second = Arc::new(2);

        let queue = Queue::new();
        queue.enqueue(first.clone());
        queue.enqueue(second.clone());

        drop(queue.dequeue());
        assert_eq!(Arc::strong_count(&first), 2);

        // Retiring the old placeholder releases `first`.
        drop(queue.dequeue());
        assert_eq!(Arc::strong_count(&first), 1);
        assert_eq!(Arc::strong_count(&second), 2);

        drop(queue);
        assert_eq!(Arc::strong_count(&second), 1);
    }

    #[test]
    fn test_enqueue_dequeue_sync() {
        let queue = Arc::new(Queue::new());

        let mut threads = vec![];

        for i in 0..10 {
            let queue = queue.clone();

            threads.push(thread::spawn(move || {
                let mut enqueued: i64 = 0;
                let mut dequeued: i64 = 0;

                for _ in 0..1000 {
                    if rand::random::<u8>() % 3 != 0 {
                        queue.enqueue(i);
                        enqueued += 1;
                    } else if queue.dequeue().is_some() {
                        dequeued += 1;
                    }
                }

                enqueued - dequeued
            }))
        }

        let remaining: i64 = threads.into_iter().map(|t| t.join().unwrap()).sum();

        assert_eq!(queue.len() as i64, remaining);

        let queue = Arc::try_unwrap(queue).unwrap();
        assert_eq!(queue.into_iter().count() as i64, remaining);
    }

    #[test]
    fn test_append() {
        let queue: Queue<i32> = (0..5).collect();
        let other: Queue<i32> = (5..10).collect();

        queue.append(other);
        queue.enqueue(10);

        assert_eq!(queue.len(), 11);
        assert_eq!(queue.into_iter().collect::<Vec<_>>(), (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_append_empty() {
        let queue: Queue<i32> = (0..3).collect();

        queue.append(Queue::new());
        queue.enqueue(3);

        assert_eq!(queue.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_append_into_empty() {
        let queue = Queue::new();

        queue.append((0..3).collect());

        assert_eq!(queue.peek().map(|e| *e), Some(0));
        assert_eq!(queue.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_drop_releases_values() {
        let val = Arc::new(());

        {
            let queue = Queue::new();
            (0..10).for_each(|_| queue.enqueue(val.clone()));
            assert_eq!(Arc::strong_count(&val), 11);
        }

        assert_eq!(Arc::strong_count(&val), 1);
    }

    #[test]
    fn test_into_iter_moves_values() {
        let val = Arc::new(());

        let queue: Queue<_> = (0..10).map(|_| val.clone()).collect();
        let mut iter = queue.into_iter();

        let first = iter.next();
        assert!(first.is_some());
        drop(iter);

        assert_eq!(Arc::strong_count(&val), 2);
        drop(first);
        assert_eq!(Arc::strong_count(&val), 1);
    }
}

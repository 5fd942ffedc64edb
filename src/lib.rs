//! Lock free LIFO [`Stack`] and FIFO [`Queue`].
//!
//! Both containers synchronize through compare-and-swap on a single
//! pointer per operation and never block. Nodes removed from a container are
//! reclaimed with hazard pointers, so [`Stack::pop`], [`Queue::dequeue`] and
//! the `peek` methods hand out borrowed guards rather than owned values.
//!
//! ```
//! use lflist::{Queue, Stack};
//!
//! let stack = Stack::new();
//! stack.push(1);
//! stack.push(2);
//! assert_eq!(stack.pop().map(|e| *e), Some(2));
//!
//! let queue = Queue::new();
//! queue.enqueue("a");
//! queue.enqueue("b");
//! assert_eq!(queue.dequeue().map(|e| *e), Some("a"));
//! assert_eq!(queue.len(), 1);
//! ```

/// Notes a lost CAS. Compiles to nothing without the `tracing` feature.
macro_rules! trace_retry {
    ($op:literal) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(op = $op, "lost CAS to a concurrent update, retrying");
    };
}

mod link;
mod node;
pub mod queue;
mod reclaim;
pub mod stack;

pub(crate) use link::Link;
pub use queue::Queue;
pub use reclaim::{Entry, NodeRef};
pub use stack::Stack;

extern crate alloc;

/// Clamps a counter that a removal decremented before the matching insert
/// incremented it.
pub(crate) fn approximate_len(len: usize) -> usize {
    if len > isize::MAX as usize {
        0
    } else {
        len
    }
}

/// An operation against either container, for driving them from fuzz
/// input.
#[cfg(feature = "arbitrary")]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Operation<T> {
    Insert { item: T },
    Remove,
    Peek,
    RemoveInsert,
    Append { items: Vec<T> },
    Len,
}

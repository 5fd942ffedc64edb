use crate::Link;
use alloc::alloc::{alloc, dealloc, handle_alloc_error};
use core::alloc::Layout;
use core::ptr::{null_mut, NonNull};

/// Storage cell shared by [`Stack`](crate::Stack) and [`Queue`](crate::Queue).
///
/// `val` is `None` only for the placeholder a queue is constructed with.
pub(crate) struct Node<V> {
    pub(crate) val: Option<V>,
    pub(crate) next: Link<Self>,
}

impl<V> Node<V> {
    pub(crate) fn new(val: Option<V>) -> *mut Self {
        unsafe {
            let node = Self::alloc();
            core::ptr::write(
                node,
                Node {
                    val,
                    next: Link::new(null_mut()),
                },
            );
            node
        }
    }

    unsafe fn alloc() -> *mut Self {
        let layout = Layout::new::<Self>();
        let raw = alloc(layout).cast::<Self>();
        if raw.is_null() {
            handle_alloc_error(layout);
        }
        raw
    }

    unsafe fn dealloc(raw: *mut Self) {
        dealloc(raw.cast(), Layout::new::<Self>());
    }

    /// Drops the value and frees the node.
    pub(crate) unsafe fn drop(raw: *mut Self) {
        core::ptr::drop_in_place(&mut (*raw).val);
        Self::dealloc(raw);
    }

    /// Frees the node, handing its value back to the caller.
    pub(crate) unsafe fn into_val(raw: *mut Self) -> Option<V> {
        let val = core::ptr::read(&(*raw).val);
        Self::dealloc(raw);
        val
    }

    /// Frees every node reachable from `curr`, `curr` included.
    pub(crate) unsafe fn drop_chain(mut curr: *mut Self) {
        while !curr.is_null() {
            let next = (*curr).next.load_ptr();
            Self::drop(curr);
            curr = next;
        }
    }
}

/// Owning handle the hazard pointer domain drops once a retired node is no
/// longer protected.
#[repr(transparent)]
pub(crate) struct DropNode<V>(NonNull<Node<V>>);

impl<V> Drop for DropNode<V> {
    fn drop(&mut self) {
        unsafe {
            Node::drop(self.0.as_ptr());
        }
    }
}

impl<V> core::ops::Deref for DropNode<V> {
    type Target = Node<V>;
    fn deref(&self) -> &Self::Target {
        unsafe { self.0.as_ref() }
    }
}

unsafe impl<V> haphazard::raw::Pointer<Node<V>> for DropNode<V> {
    fn into_raw(self) -> *mut Node<V> {
        let raw = self.0.as_ptr();
        core::mem::forget(self);
        raw
    }

    unsafe fn from_raw(ptr: *mut Node<V>) -> Self {
        Self(NonNull::new_unchecked(ptr))
    }
}

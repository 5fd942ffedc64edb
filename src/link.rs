use core::sync::atomic::{AtomicPtr, Ordering};

/// An atomically updatable pointer to the next node of a chain, or to the
/// `head`/`tail` of a container.
#[repr(transparent)]
pub(crate) struct Link<T> {
    ptr: AtomicPtr<T>,
}

impl<T> Link<T> {
    pub(crate) const fn new(ptr: *mut T) -> Self {
        Link {
            ptr: AtomicPtr::new(ptr),
        }
    }

    pub(crate) fn load_ptr(&self) -> *mut T {
        self.ptr.load(Ordering::Acquire)
    }

    pub(crate) fn store_ptr(&self, ptr: *mut T) {
        self.ptr.store(ptr, Ordering::Release)
    }

    /// On failure returns the pointer that was found instead of `current`.
    pub(crate) fn compare_exchange(
        &self,
        current: *mut T,
        new: *mut T,
        success: Ordering,
        failure: Ordering,
    ) -> Result<*mut T, *mut T> {
        self.ptr.compare_exchange(current, new, success, failure)
    }

    /// Exclusive access needs no synchronization.
    pub(crate) fn get_mut(&mut self) -> &mut *mut T {
        self.ptr.get_mut()
    }
}

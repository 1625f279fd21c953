use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering, fence};

// Owner counter shared by every SharedPtr pointing at the same object. Lives in its own allocation, which
// is released by whoever observes the count dropping from one to zero.

// Past this many owners a wrapping increment becomes a realistic use-after-free.
const MAX_COUNT : usize = isize::MAX as usize;

#[repr(transparent)]
pub (crate) struct Counter {
    count : NonNull<AtomicUsize>
}

/// What a release observed on the counter.
#[derive(PartialEq, Eq, Debug)]
pub (crate) enum Release {
    /// The releasing owner was the last one. Caller must destroy the object, then the counter.
    Last,
    /// Other owners remain.
    Shared
}

impl Counter {
    /// Allocates a control block for a freshly adopted object. Starts at one owner.
    #[inline]
    pub fn create() -> Counter {
        let count = Box::new(AtomicUsize::new(1));
        let count = unsafe { NonNull::new_unchecked(Box::into_raw(count)) };
        log::trace!("control block {:p} created", count);
        Counter { count }
    }

    #[inline(always)]
    fn atomic(&self) -> &AtomicUsize {
        //valid until destroy, which consumes the last Counter
        unsafe { self.count.as_ref() }
    }

    /// Registers one more owner and returns a second handle to the same block.
    #[inline]
    pub fn share(&self) -> Counter {
        // A new owner is always made from an existing one, so nothing needs to be ordered here.
        let previous = self.atomic().fetch_add(1, Ordering::Relaxed);
        debug_assert!(previous != 0, "counter revived after reaching zero");
        if previous >= MAX_COUNT {
            std::process::abort();
        }
        Counter { count : self.count }
    }

    /// Drops one owner. Exactly one of all concurrent releasers of a block can get `Release::Last`.
    #[inline]
    pub fn release(&self) -> Release {
        let previous = self.atomic().fetch_sub(1, Ordering::Release);
        debug_assert!(previous != 0, "counter underflow");
        if previous != 1 {
            return Release::Shared;
        }
        // Everything other owners did through the object happens-before its destruction.
        fence(Ordering::Acquire);
        Release::Last
    }

    #[inline(always)]
    pub fn load(&self) -> usize {
        self.atomic().load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn same_block(&self, other : &Counter) -> bool {
        self.count == other.count
    }

    /// Frees the control block.
    /// # Safety
    /// Must only be called after `release` returned `Release::Last` on this block.
    #[inline]
    pub unsafe fn destroy(self) {
        debug_assert_eq!(self.load(), 0);
        drop(Box::from_raw(self.count.as_ptr()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_block_has_one_owner() {
        let counter = Counter::create();
        assert_eq!(counter.load(), 1);
        assert_eq!(counter.release(), Release::Last);
        unsafe { counter.destroy(); }
    }

    #[test]
    fn last_release_is_reported_once() {
        let first = Counter::create();
        let second = first.share();
        let third = second.share();
        assert!(first.same_block(&third));
        assert_eq!(first.load(), 3);

        assert_eq!(second.release(), Release::Shared);
        assert_eq!(first.release(), Release::Shared);
        assert_eq!(third.load(), 1);
        assert_eq!(third.release(), Release::Last);
        unsafe { third.destroy(); }
    }

    #[test]
    fn distinct_blocks_differ() {
        let a = Counter::create();
        let b = Counter::create();
        assert!(!a.same_block(&b));
        for c in vec![a, b] {
            assert_eq!(c.release(), Release::Last);
            unsafe { c.destroy(); }
        }
    }
}

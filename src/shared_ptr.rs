use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ops::Deref;
use core::ptr::{self, NonNull};

mod counter;
use self::counter::{Counter, Release};

/// A thread-safe shared-ownership pointer. Every non-empty `SharedPtr` counts as one owner of the managed
/// object, which is dropped exactly once, when the last owner lets go of it.
///
/// A `SharedPtr` may also be empty, owning nothing. Dereferencing an empty pointer panics.
pub struct SharedPtr<T : ?Sized> {
    //Invariant P: `counter` is Some if and only if `object` is Some.
    counter : Option<Counter>,
    object : Option<NonNull<T>>,
    _ph : PhantomData<T>
}

// Only the counter is shared mutable state and it is atomic. The object itself is only handed out as &T.
unsafe impl <T : ?Sized + Send + Sync> Send for SharedPtr<T> {}
unsafe impl <T : ?Sized + Send + Sync> Sync for SharedPtr<T> {}

impl <T : ?Sized> SharedPtr<T> {
    /// Creates an empty pointer. Does not allocate.
    pub const fn empty() -> Self
    {
        SharedPtr { counter : None, object : None, _ph : PhantomData }
    }

    /// Takes ownership of a boxed object. This is the way to build a pointer to a trait object:
    /// `SharedPtr::<dyn Trait>::from_box(Box::new(value))`.
    pub fn from_box(object : Box<T>) -> Self
    {
        let object = unsafe { NonNull::new_unchecked(Box::into_raw(object)) };
        Self::adopt(object)
    }

    /// Takes ownership of a raw pointer. A null `object` gives an empty pointer and no control block.
    /// # Safety
    /// A non-null `object` must come from `Box::into_raw` and must not be owned by anything else.
    pub unsafe fn from_raw(object : *mut T) -> Self
    {
        match NonNull::new(object) {
            Some(object) => Self::adopt(object),
            None => Self::empty()
        }
    }

    fn adopt(object : NonNull<T>) -> Self
    {
        SharedPtr { counter : Some(Counter::create()), object : Some(object), _ph : PhantomData }
    }

    /// Returns a reference to the managed object or None if the pointer is empty.
    #[inline]
    pub fn get(&self) -> Option<&T>
    {
        //(P) and the count we hold keep the object alive for as long as &self is borrowed
        self.object.as_ref().map(|object| unsafe { object.as_ref() })
    }

    /// Returns the number of pointers sharing the managed object, or 0 if the pointer is empty.
    /// The value is a snapshot: other threads may change it before the caller looks at it.
    #[inline]
    pub fn use_count(&self) -> usize
    {
        self.counter.as_ref().map_or(0, Counter::load)
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.object.is_none()
    }

    /// Returns true if both pointers share the same control block, or if both are empty.
    #[inline]
    pub fn ptr_eq(this : &Self, other : &Self) -> bool
    {
        match (&this.counter, &other.counter) {
            (Some(a), Some(b)) => a.same_block(b),
            (None, None) => true,
            _ => false
        }
    }

    /// Exchanges two pointers. Neither count changes.
    #[inline]
    pub fn swap(this : &mut Self, other : &mut Self)
    {
        mem::swap(this, other);
    }

    /// Moves ownership out of `self`, leaving it empty. The count does not change.
    #[inline]
    pub fn take(&mut self) -> Self
    {
        mem::replace(self, SharedPtr::empty())
    }

    /// Replaces the contents of `self` with `other`. When both already share the same control block, `self`
    /// keeps its ownership and the surplus one held by `other` is dropped.
    pub fn assign(&mut self, mut other : Self)
    {
        if SharedPtr::ptr_eq(self, &other) {
            return;
        }
        self.release();
        self.counter = other.counter.take();
        self.object = other.object.take();
    }

    /// Releases ownership and leaves the pointer empty. Does nothing on an empty pointer.
    pub fn reset(&mut self)
    {
        self.release();
    }

    /// Releases ownership, destroying the old object if this was the last owner, then takes ownership
    /// of `object`.
    pub fn reset_with(&mut self, object : Box<T>)
    {
        self.release();
        *self = SharedPtr::from_box(object);
    }

    /// Same as `reset_with` for a raw pointer. A null `object` leaves the pointer empty.
    /// # Safety
    /// Same contract as `from_raw`.
    pub unsafe fn reset_raw(&mut self, object : *mut T)
    {
        self.release();
        *self = SharedPtr::from_raw(object);
    }

    // Both fields are cleared before the object is dropped, so the pointer is empty whichever
    // branch is taken, even if the object's destructor panics.
    fn release(&mut self)
    {
        debug_assert_eq!(self.counter.is_some(), self.object.is_some());
        let (counter, object) = match (self.counter.take(), self.object.take()) {
            (Some(counter), Some(object)) => (counter, object),
            _ => return
        };

        if counter.release() == Release::Last {
            log::trace!("last owner of {:p} released, destroying", object);
            unsafe {
                //only the thread that saw the count leave 1 gets here
                drop(Box::from_raw(object.as_ptr()));
                counter.destroy();
            }
        }
    }
}

impl <T> SharedPtr<T> {
    /// Moves `value` to the heap and takes ownership of it.
    pub fn new(value : T) -> Self
    {
        SharedPtr::from_box(Box::new(value))
    }

    /// Returns a raw pointer to the managed object, or null if the pointer is empty.
    #[inline]
    pub fn as_ptr(this : &Self) -> *const T
    {
        match this.object {
            Some(object) => object.as_ptr() as *const T,
            None => ptr::null()
        }
    }
}

impl <T : ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self
    {
        SharedPtr {
            counter : self.counter.as_ref().map(Counter::share),
            object : self.object,
            _ph : PhantomData
        }
    }

    /// Copy-assignment. Assigning a pointer that already shares our control block is a no-op.
    fn clone_from(&mut self, source : &Self)
    {
        if SharedPtr::ptr_eq(self, source) {
            return;
        }
        self.release();
        self.counter = source.counter.as_ref().map(Counter::share);
        self.object = source.object;
    }
}

impl <T : ?Sized> Drop for SharedPtr<T> {
    fn drop(&mut self)
    {
        self.release();
    }
}

impl <T : ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    /// # Panics
    /// Panics if the pointer is empty.
    #[inline]
    fn deref(&self) -> &T
    {
        match self.get() {
            Some(object) => object,
            None => panic!("dereferenced an empty SharedPtr")
        }
    }
}

impl <T : ?Sized> Default for SharedPtr<T> {
    fn default() -> Self
    {
        SharedPtr::empty()
    }
}

impl <T : ?Sized> From<Box<T>> for SharedPtr<T> {
    fn from(object : Box<T>) -> Self
    {
        SharedPtr::from_box(object)
    }
}

impl <T : ?Sized + fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.get() {
            Some(object) => f.debug_struct("SharedPtr")
                .field("object", &object)
                .field("use_count", &self.use_count())
                .finish(),
            None => f.write_str("SharedPtr(Empty)")
        }
    }
}

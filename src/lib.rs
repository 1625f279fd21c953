//! Reference-counted shared ownership.
//!
//! A [`SharedPtr`] lets several owners, possibly on different threads, share one heap object. The owner
//! count lives in a separately allocated control block and is only ever changed through atomic
//! operations, so copies and drops can race freely. The object is destroyed by whichever owner drops
//! the count to zero, and by nobody else.
//!
//! ```
//! use shared_handle::SharedPtr;
//!
//! let first = SharedPtr::new(String::from("shared"));
//! let second = first.clone();
//! assert_eq!(first.use_count(), 2);
//! assert_eq!(*second, "shared");
//!
//! drop(first);
//! assert_eq!(second.use_count(), 1);
//! ```

pub mod shared_ptr;
pub use crate::shared_ptr::*;

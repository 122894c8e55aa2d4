//! Allocators for the slot arrays of a table.
//!
//! The [`Allocator`] trait lets a caller decide, per table, where slot memory
//! comes from. [`Global`] defers to the global allocator of the `alloc`
//! crate; [`FnAllocator`] wraps a plain pair of allocate/release functions.

use core::alloc::Layout;

/// A source of raw memory for slot arrays.
///
/// # Safety
///
/// Implementations must return either null or a pointer to a block valid for
/// reads and writes of `layout.size()` bytes, aligned to `layout.align()`,
/// which stays valid until passed back to `deallocate`.
pub unsafe trait Allocator {
    /// Allocates memory as per the size and alignment requirements.
    ///
    /// Returns a null pointer if the request cannot be satisfied.
    ///
    /// # Safety
    ///
    /// - `layout` must have a non-zero size.
    unsafe fn allocate(&self, layout: Layout) -> *mut u8;

    /// Releases memory.
    ///
    /// # Safety
    ///
    /// - `ptr` must have been returned by `self.allocate`.
    /// - `ptr` must not have been released already.
    /// - `layout` must match the layout `ptr` was allocated with.
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout);
}

/// The global allocator of the `alloc` crate.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Global;

// SAFETY: Forwards to the global allocator, which upholds the contract.
unsafe impl Allocator for Global {
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 {
        // SAFETY: Caller guarantees a non-zero size.
        unsafe { alloc::alloc::alloc(layout) }
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { alloc::alloc::dealloc(ptr, layout) }
    }
}

/// An allocator built from a caller-supplied allocate/release pair.
///
/// # Examples
///
/// ```rust
/// use core::alloc::Layout;
///
/// use probe_table::allocator::FnAllocator;
/// use probe_table::hasher::Fnv1aBuildHasher;
/// use probe_table::{HashTable, Hooks};
///
/// fn allocate(layout: Layout) -> *mut u8 {
///     unsafe { std::alloc::alloc_zeroed(layout) }
/// }
///
/// fn release(ptr: *mut u8, layout: Layout) {
///     unsafe { std::alloc::dealloc(ptr, layout) }
/// }
///
/// let allocator = unsafe { FnAllocator::new(allocate, release) };
/// let mut table: HashTable<u32, u32, _, _> =
///     HashTable::with_allocator(16, Hooks::none(), Fnv1aBuildHasher, allocator);
/// table.insert(1, 2);
/// assert_eq!(table.get(&1), &2);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FnAllocator {
    allocate: fn(Layout) -> *mut u8,
    release: fn(*mut u8, Layout),
}

impl FnAllocator {
    /// Wraps an allocate/release pair.
    ///
    /// # Safety
    ///
    /// `allocate` must behave as [`Allocator::allocate`] requires, and
    /// `release` must accept every pointer produced by `allocate` together
    /// with its layout.
    pub unsafe fn new(allocate: fn(Layout) -> *mut u8, release: fn(*mut u8, Layout)) -> Self {
        Self { allocate, release }
    }
}

// SAFETY: The constructor requires the wrapped functions to uphold the
// contract.
unsafe impl Allocator for FnAllocator {
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 {
        (self.allocate)(layout)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        (self.release)(ptr, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_round_trip() {
        let layout = Layout::array::<u64>(8).unwrap();
        // SAFETY: Non-zero layout, pointer released with the same layout.
        unsafe {
            let ptr = Global.allocate(layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % layout.align(), 0);
            ptr.cast::<u64>().write(42);
            assert_eq!(ptr.cast::<u64>().read(), 42);
            Global.deallocate(ptr, layout);
        }
    }

    #[test]
    fn fn_allocator_forwards() {
        fn fail(_: Layout) -> *mut u8 {
            core::ptr::null_mut()
        }

        fn release(_: *mut u8, _: Layout) {
            unreachable!("nothing was allocated");
        }

        // SAFETY: `fail` never hands out memory, so `release` is never owed.
        let allocator = unsafe { FnAllocator::new(fail, release) };
        // SAFETY: Non-zero layout.
        let ptr = unsafe { allocator.allocate(Layout::new::<u64>()) };
        assert!(ptr.is_null());
    }
}

//! The error and result types of this crate.
//!
//! Operations that may allocate, or that may need a free slot, come in two
//! versions:
//!
//! - A fallible `try_xxx` version returning a [`Result`] with [`Error`] as the
//!   error type.
//! - A convenience `xxx` version which invokes the `try_xxx` version and
//!   treats any error as fatal.
//!
//! A missing key is never an error; lookups report absence through `Option`
//! or `bool`.

use core::alloc::Layout;

/// Failures raised while inserting into, or growing, a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A table on borrowed buffers has no free slot for a new key.
    #[error("fixed-capacity table is full ({capacity} slots)")]
    CapacityExhausted {
        /// The fixed slot count of the table.
        capacity: usize,
    },
    /// The slot arrays for the requested capacity do not fit in memory.
    #[error("slot arrays for {capacity} slots overflow the address space")]
    CapacityOverflow {
        /// The slot count which could not be laid out.
        capacity: usize,
    },
    /// The allocator returned no memory.
    #[error("allocator failed to provide {} bytes", .layout.size())]
    OutOfMemory {
        /// The layout of the failed request.
        layout: Layout,
    },
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

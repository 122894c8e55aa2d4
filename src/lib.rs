#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(all(test, not(feature = "std")))]
extern crate std;

pub mod allocator;
pub mod error;
pub mod hash_table;
pub mod hasher;
pub mod hooks;

pub use error::Error;
pub use error::Result;
pub use hash_table::HashTable;
pub use hash_table::Status;
pub use hooks::Hooks;

//! Hash builders usable with [`HashTable`](crate::HashTable).
//!
//! None of these are suitable against adversarial keys; they trade strength
//! for speed and, for [`IdentityBuildHasher`], predictable slot placement.

use core::hash::BuildHasher;
use core::hash::Hasher;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hash builder used when none is given: `foldhash`'s fast, randomly
        /// seeded state.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hash builder used when none is given: the standard library's
        /// randomly seeded SipHash state.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Hash builder used when none is given: unseeded FNV-1a.
        pub type DefaultHashBuilder = Fnv1aBuildHasher;
    }
}

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over every byte written.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1aHasher {
    hash: u32,
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self {
            hash: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.hash as u64
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash ^= byte as u32;
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Builds [`Fnv1aHasher`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fnv1aBuildHasher;

impl BuildHasher for Fnv1aBuildHasher {
    type Hasher = Fnv1aHasher;

    fn build_hasher(&self) -> Self::Hasher {
        Fnv1aHasher::default()
    }
}

/// Passes a single integer write through unchanged.
///
/// An integer key `k` hashed with this lands in slot `k % capacity`, which
/// makes collisions easy to arrange. Anything written after the first
/// integer, and every byte-slice write (strings, for instance), is folded
/// with FNV-1a.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    hash: u64,
    written: bool,
}

impl IdentityHasher {
    #[inline]
    fn write_int(&mut self, value: u64, width: usize) {
        if self.written {
            self.write(&value.to_le_bytes()[..width]);
        } else {
            self.hash = value;
            self.written = true;
        }
    }
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut fnv = Fnv1aHasher {
            hash: FNV_OFFSET_BASIS ^ self.hash as u32,
        };
        fnv.write(bytes);
        self.hash = fnv.finish();
        self.written = true;
    }

    fn write_u8(&mut self, i: u8) {
        self.write_int(i as u64, 1);
    }

    fn write_u16(&mut self, i: u16) {
        self.write_int(i as u64, 2);
    }

    fn write_u32(&mut self, i: u32) {
        self.write_int(i as u64, 4);
    }

    fn write_u64(&mut self, i: u64) {
        self.write_int(i, 8);
    }

    fn write_usize(&mut self, i: usize) {
        self.write_int(i as u64, size_of::<usize>());
    }

    fn write_i8(&mut self, i: i8) {
        self.write_u8(i as u8);
    }

    fn write_i16(&mut self, i: i16) {
        self.write_u16(i as u16);
    }

    fn write_i32(&mut self, i: i32) {
        self.write_u32(i as u32);
    }

    fn write_i64(&mut self, i: i64) {
        self.write_u64(i as u64);
    }

    fn write_isize(&mut self, i: isize) {
        self.write_usize(i as usize);
    }
}

/// Builds [`IdentityHasher`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityBuildHasher;

impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_vectors() {
        let mut h = Fnv1aHasher::default();
        assert_eq!(h.finish(), FNV_OFFSET_BASIS as u64);

        h.write(b"a");
        assert_eq!(h.finish(), 0xe40c292c);

        let mut h = Fnv1aHasher::default();
        h.write(b"foobar");
        assert_eq!(h.finish(), 0xbf9cf968);
    }

    #[test]
    fn identity_passes_integers() {
        assert_eq!(IdentityBuildHasher.hash_one(42u64), 42);
        assert_eq!(IdentityBuildHasher.hash_one(7u32), 7);
        assert_eq!(IdentityBuildHasher.hash_one(-1i32), u32::MAX as u64);
        assert_ne!(IdentityBuildHasher.hash_one((1u64, 2u64)), 1);
    }

    #[test]
    fn identity_folds_strings() {
        let a = IdentityBuildHasher.hash_one("hello");
        let b = IdentityBuildHasher.hash_one("hello");
        let c = IdentityBuildHasher.hash_one("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, 0xff);
    }
}

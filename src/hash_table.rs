//! The open-addressing table.
//!
//! Entries live in three parallel slot arrays (statuses, keys, values) of
//! equal length. A key is looked for starting at `hash(key) % capacity` and
//! then one slot further at a time, wrapping around, until it is found, an
//! [`Status::Empty`] slot ends the scan, or every slot has been visited.
//! Removal leaves a [`Status::Tombstone`] so that scans for other keys keep
//! walking past the vacated slot.

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ops::Index;
use core::ptr::NonNull;

use log::debug;
use log::trace;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::Error;
use crate::error::Result;
use crate::hasher::DefaultHashBuilder;
use crate::hooks::Hooks;

/// Slot count of a table created without an explicit capacity.
pub const DEFAULT_CAPACITY: usize = 64;

/// Live-entry percentage of the slot count at which an allocator-backed
/// table doubles before inserting.
pub const MAX_FILL_PERCENT: usize = 80;

#[inline(always)]
fn grow_threshold(capacity: usize) -> usize {
    ((capacity as u128 * MAX_FILL_PERCENT as u128) / 100) as usize
}

/// Per-slot state.
///
/// The zero byte is `Empty`, so zeroed memory is a valid, empty status array.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Never used since the slot arrays were (re)built.
    #[default]
    Empty = 0,
    /// Holds a live key and value.
    Occupied = 1,
    /// Held an entry which was removed; scans continue past it.
    Tombstone = 2,
}

/// Offsets of the three slot arrays inside a single allocation.
///
/// Statuses come first so that the one-byte tags can be zeroed in one go.
#[derive(Clone, Copy, Debug)]
struct DataLayout {
    layout: Layout,
    keys_offset: usize,
    vals_offset: usize,
}

impl DataLayout {
    fn new<K, V>(capacity: usize) -> Result<Self> {
        let overflow = |_| Error::CapacityOverflow { capacity };

        let status_layout = Layout::array::<Status>(capacity).map_err(overflow)?;
        let keys_layout = Layout::array::<MaybeUninit<K>>(capacity).map_err(overflow)?;
        let vals_layout = Layout::array::<MaybeUninit<V>>(capacity).map_err(overflow)?;

        let (layout, keys_offset) = status_layout.extend(keys_layout).map_err(overflow)?;
        let (layout, vals_offset) = layout.extend(vals_layout).map_err(overflow)?;

        Ok(DataLayout {
            layout: layout.pad_to_align(),
            keys_offset,
            vals_offset,
        })
    }
}

/// Base pointers of the slot arrays. Every array holds `capacity` slots.
struct Slots<K, V> {
    status: NonNull<Status>,
    keys: NonNull<MaybeUninit<K>>,
    vals: NonNull<MaybeUninit<V>>,
    capacity: usize,
}

/// Who owns the memory behind [`Slots`].
#[derive(Clone, Copy, Debug)]
enum Backing {
    /// One block from the table's allocator; released on growth and drop.
    Allocated { base: NonNull<u8>, layout: DataLayout },
    /// Caller buffers; never released, never replaced.
    Borrowed,
}

/// Slot arrays replaced by growth.
///
/// Dropping this releases the block. Entries still `Occupied` at that point
/// were never moved (hashing one of them panicked) and are disposed of first.
struct RetiredSlots<'a, K, V, A: Allocator> {
    status: &'a mut [Status],
    keys: &'a [MaybeUninit<K>],
    vals: &'a [MaybeUninit<V>],
    backing: Backing,
    hooks: Hooks<K, V>,
    allocator: &'a A,
}

impl<K, V, A: Allocator> Drop for RetiredSlots<'_, K, V, A> {
    fn drop(&mut self) {
        for index in 0..self.status.len() {
            if self.status[index] != Status::Occupied {
                continue;
            }
            self.status[index] = Status::Empty;

            // SAFETY: The slot was Occupied and is now Empty, so it is read out
            // exactly once.
            let (key, value) = unsafe {
                (
                    self.keys[index].assume_init_read(),
                    self.vals[index].assume_init_read(),
                )
            };
            self.hooks.dispose(key, value);
        }

        if let Backing::Allocated { base, layout } = self.backing {
            // SAFETY: The block came from `self.allocator` with this layout and
            // holds no live entries.
            unsafe {
                self.allocator.deallocate(base.as_ptr(), layout.layout);
            }
        }
    }
}

/// Allocates slot arrays for `capacity` slots, all of them `Empty`.
fn allocate_slots<K, V, A: Allocator>(
    allocator: &A,
    capacity: usize,
) -> Result<(Slots<K, V>, Backing)> {
    debug_assert!(capacity > 0);
    let layout = DataLayout::new::<K, V>(capacity)?;

    // SAFETY: The layout covers at least `capacity` status bytes, so its size is
    // non-zero.
    let raw_alloc = unsafe { allocator.allocate(layout.layout) };
    let Some(base) = NonNull::new(raw_alloc) else {
        return Err(Error::OutOfMemory {
            layout: layout.layout,
        });
    };

    // SAFETY: The block is `layout.layout.size()` bytes long and both offsets were
    // produced by `Layout::extend` over the same block. Statuses start at offset
    // 0 and span `capacity` bytes.
    unsafe {
        core::ptr::write_bytes(base.as_ptr(), Status::Empty as u8, capacity);

        Ok((
            Slots {
                status: base.cast(),
                keys: base.add(layout.keys_offset).cast(),
                vals: base.add(layout.vals_offset).cast(),
                capacity,
            },
            Backing::Allocated { base, layout },
        ))
    }
}

/// First slot at or after `start` (wrapping) that is not `Occupied`.
///
/// The caller guarantees at least one such slot exists.
#[inline]
fn probe_vacant(status: &[Status], start: usize) -> usize {
    debug_assert!(status.iter().any(|s| *s != Status::Occupied));
    let mut index = start;
    while status[index] == Status::Occupied {
        index += 1;
        if index == status.len() {
            index = 0;
        }
    }
    index
}

#[cold]
#[inline(never)]
#[track_caller]
fn fatal(error: Error) -> ! {
    match error {
        Error::OutOfMemory { layout } => handle_alloc_error(layout),
        error => panic!("{error}"),
    }
}

/// Slot-level statistics for inspecting a table.
///
/// Compiled with `cfg(test)` or the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries.
    pub populated: usize,
    /// Total number of slots.
    pub capacity: usize,
    /// Slots marked `Occupied`.
    pub occupied_slots: usize,
    /// Slots marked `Tombstone`.
    pub tombstones: usize,
    /// Slots marked `Empty`.
    pub empty_slots: usize,
    /// populated / capacity
    pub load_factor: f64,
    /// Largest distance of any entry from its home slot.
    pub longest_probe: usize,
    /// Bytes spanned by the slot arrays.
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Slots: {} occupied, {} tombstones, {} empty",
            self.occupied_slots, self.tombstones, self.empty_slots
        );
        println!("Longest probe: {}", self.longest_probe);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Number of entries at each distance from their home slot.
///
/// Compiled with `cfg(test)` or the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `bins[d]` counts the entries stored `d` slots past their home slot.
    pub bins: alloc::vec::Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Pretty-prints the histogram as a horizontal bar chart on stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!(
            "probe histogram ({} entries):",
            self.bins.iter().sum::<usize>()
        );
        for (distance, &count) in self.bins.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", distance, "█".repeat(width), count);
        }
    }
}

/// A linear-probing hash table with tombstone deletion.
///
/// `HashTable<K, V, S, A>` maps keys of type `K` to values of type `V`,
/// hashing keys with the [`BuildHasher`] `S`. The slot arrays come from one
/// of two places:
///
/// - the allocator `A` ([`Global`] unless another is given); such a table
///   doubles its slot count whenever an insert finds it at least
///   [`MAX_FILL_PERCENT`] full, counting live entries only;
/// - three caller-owned buffers living for `'buf` (see
///   [`on_buffers`](HashTable::on_buffers)); such a table never grows, and
///   inserting a new key into a full one is fatal.
///
/// Optional [`Hooks`] make the table *managed*: keys and values are copied
/// through the clone hooks on insert and released through the drop hooks on
/// overwrite, removal and teardown.
///
/// The table does no internal synchronization; Rust's borrow rules are the
/// only serialization of access.
///
/// ## Example
///
/// ```rust
/// use probe_table::HashTable;
///
/// let mut table = HashTable::new();
/// table.insert("hello", "world");
/// table.insert("mother", "fucker");
/// table.insert("mother", "fucka");
///
/// assert_eq!(table.get("hello"), &"world");
/// assert_eq!(table.get("mother"), &"fucka");
/// assert_eq!(table.len(), 2);
/// ```
pub struct HashTable<'buf, K, V, S = DefaultHashBuilder, A: Allocator = Global> {
    slots: Slots<K, V>,
    backing: Backing,

    count: usize,

    hooks: Hooks<K, V>,
    hash_builder: S,
    allocator: A,

    _marker: PhantomData<(&'buf mut [Status], K, V)>,
}

// SAFETY: The table exclusively owns its entries (or exclusively borrows the
// buffers holding them) and has no shared interior state.
unsafe impl<K, V, S, A> Send for HashTable<'_, K, V, S, A>
where
    K: Send,
    V: Send,
    S: Send,
    A: Allocator + Send,
{
}

// SAFETY: Shared references only permit reads of the slot arrays.
unsafe impl<K, V, S, A> Sync for HashTable<'_, K, V, S, A>
where
    K: Sync,
    V: Sync,
    S: Sync,
    A: Allocator + Sync,
{
}

impl<K, V, S, A> Debug for HashTable<'_, K, V, S, A>
where
    K: Debug,
    V: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, A: Allocator> Drop for HashTable<'_, K, V, S, A> {
    fn drop(&mut self) {
        self.clear();

        if let Backing::Allocated { base, layout } = self.backing {
            // SAFETY: `base` was returned by `self.allocator` for `layout` and
            // is released only here or on growth, which replaces it.
            unsafe {
                self.allocator.deallocate(base.as_ptr(), layout.layout);
            }
        }
    }
}

impl<K, V> HashTable<'static, K, V, DefaultHashBuilder, Global> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty table with exactly `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::HashTable;
    /// #
    /// let table: HashTable<u32, u32> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }

    /// Creates an empty managed table with [`DEFAULT_CAPACITY`] slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::{HashTable, Hooks};
    /// #
    /// let mut table = HashTable::managed(Hooks::managed());
    /// table.insert("hello".to_string(), "world".to_string());
    ///
    /// let copy = table.get_copy("hello");
    /// assert_eq!(&copy, table.get("hello"));
    /// assert_ne!(copy.as_ptr(), table.get("hello").as_ptr());
    /// ```
    pub fn managed(hooks: Hooks<K, V>) -> Self {
        Self::managed_with_hasher(DEFAULT_CAPACITY, hooks, DefaultHashBuilder::default())
    }
}

impl<K, V> Default for HashTable<'static, K, V, DefaultHashBuilder, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashTable<'static, K, V, S, Global> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] slots, hashing with
    /// `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hash_builder)
    }

    /// Creates an empty table with exactly `capacity` slots, hashing with
    /// `hash_builder`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::managed_with_hasher(capacity, Hooks::none(), hash_builder)
    }

    /// Creates an empty table running `hooks` over its entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn managed_with_hasher(capacity: usize, hooks: Hooks<K, V>, hash_builder: S) -> Self {
        match Self::allocated(capacity, hooks, hash_builder, Global) {
            Ok(table) => table,
            Err(error) => fatal(error),
        }
    }
}

impl<K, V, S, A: Allocator> HashTable<'static, K, V, S, A> {
    /// Creates an empty table whose slot arrays come from `allocator`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the slot arrays overflow the address
    /// space; calls [`handle_alloc_error`] if `allocator` fails.
    pub fn with_allocator(capacity: usize, hooks: Hooks<K, V>, hash_builder: S, allocator: A) -> Self {
        match Self::try_with_allocator(capacity, hooks, hash_builder, allocator) {
            Ok(table) => table,
            Err(error) => fatal(error),
        }
    }

    /// Creates an empty table whose slot arrays come from `allocator`,
    /// reporting allocation failure instead of aborting.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn try_with_allocator(
        capacity: usize,
        hooks: Hooks<K, V>,
        hash_builder: S,
        allocator: A,
    ) -> Result<Self> {
        let table = Self::allocated(capacity, hooks, hash_builder, allocator)?;
        debug!(
            "table with {capacity} slots on a custom allocator ({:?})",
            table.hooks
        );
        Ok(table)
    }

    fn allocated(capacity: usize, hooks: Hooks<K, V>, hash_builder: S, allocator: A) -> Result<Self> {
        assert!(capacity > 0, "capacity must be non-zero");

        let (slots, backing) = allocate_slots(&allocator, capacity)?;

        Ok(Self {
            slots,
            backing,
            count: 0,
            hooks,
            hash_builder,
            allocator,
            _marker: PhantomData,
        })
    }
}

impl<'buf, K, V> HashTable<'buf, K, V, DefaultHashBuilder, Global> {
    /// Creates an empty, fixed-capacity table over caller-owned buffers.
    ///
    /// The table stores entries directly in `keys`, `vals` and `status` and
    /// never allocates. Whatever the buffers held before is ignored; when the
    /// table is dropped every status is left `Empty`.
    ///
    /// # Panics
    ///
    /// Panics if the buffers are empty or differ in length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use core::mem::MaybeUninit;
    ///
    /// use probe_table::{Error, HashTable, Status};
    ///
    /// let mut keys: [MaybeUninit<u32>; 2] = [const { MaybeUninit::uninit() }; 2];
    /// let mut vals: [MaybeUninit<char>; 2] = [const { MaybeUninit::uninit() }; 2];
    /// let mut status = [Status::Empty; 2];
    ///
    /// let mut table = HashTable::on_buffers(&mut keys, &mut vals, &mut status);
    /// table.insert(1u32, 'a');
    /// table.insert(2u32, 'b');
    /// assert_eq!(
    ///     table.try_insert(3, 'c'),
    ///     Err(Error::CapacityExhausted { capacity: 2 })
    /// );
    /// ```
    pub fn on_buffers(
        keys: &'buf mut [MaybeUninit<K>],
        vals: &'buf mut [MaybeUninit<V>],
        status: &'buf mut [Status],
    ) -> Self {
        Self::on_buffers_with(keys, vals, status, Hooks::none(), DefaultHashBuilder::default())
    }
}

impl<'buf, K, V, S> HashTable<'buf, K, V, S, Global> {
    /// Creates an empty, fixed-capacity table over caller-owned buffers,
    /// running `hooks` and hashing with `hash_builder`.
    ///
    /// # Panics
    ///
    /// Panics if the buffers are empty or differ in length.
    pub fn on_buffers_with(
        keys: &'buf mut [MaybeUninit<K>],
        vals: &'buf mut [MaybeUninit<V>],
        status: &'buf mut [Status],
        hooks: Hooks<K, V>,
        hash_builder: S,
    ) -> Self {
        let capacity = status.len();
        assert!(capacity > 0, "capacity must be non-zero");
        assert!(
            keys.len() == capacity && vals.len() == capacity,
            "key, value and status buffers must have equal lengths"
        );

        status.fill(Status::Empty);
        debug!("borrowed fixed table with {capacity} slots ({hooks:?})");

        Self {
            slots: Slots {
                status: NonNull::from(status).cast(),
                keys: NonNull::from(keys).cast(),
                vals: NonNull::from(vals).cast(),
                capacity,
            },
            backing: Backing::Borrowed,
            count: 0,
            hooks,
            hash_builder,
            allocator: Global,
            _marker: PhantomData,
        }
    }
}

impl<K, V, S, A: Allocator> HashTable<'_, K, V, S, A> {
    fn status_ptr(&self) -> NonNull<[Status]> {
        NonNull::slice_from_raw_parts(self.slots.status, self.slots.capacity)
    }

    fn keys_ptr(&self) -> NonNull<[MaybeUninit<K>]> {
        NonNull::slice_from_raw_parts(self.slots.keys, self.slots.capacity)
    }

    fn vals_ptr(&self) -> NonNull<[MaybeUninit<V>]> {
        NonNull::slice_from_raw_parts(self.slots.vals, self.slots.capacity)
    }

    #[inline]
    fn statuses(&self) -> &[Status] {
        // SAFETY: Statuses are initialized for every slot from construction on.
        unsafe { self.status_ptr().as_ref() }
    }

    #[inline]
    fn statuses_mut(&mut self) -> &mut [Status] {
        // SAFETY: As above, and `&mut self` gives exclusive access.
        unsafe { self.status_ptr().as_mut() }
    }

    #[inline]
    fn key_slots(&self) -> &[MaybeUninit<K>] {
        // SAFETY: The key array spans `capacity` slots; `MaybeUninit` makes no
        // claim about their contents.
        unsafe { self.keys_ptr().as_ref() }
    }

    #[inline]
    fn key_slots_mut(&mut self) -> &mut [MaybeUninit<K>] {
        // SAFETY: As above, and `&mut self` gives exclusive access.
        unsafe { self.keys_ptr().as_mut() }
    }

    #[inline]
    fn val_slots(&self) -> &[MaybeUninit<V>] {
        // SAFETY: The value array spans `capacity` slots; `MaybeUninit` makes no
        // claim about their contents.
        unsafe { self.vals_ptr().as_ref() }
    }

    #[inline]
    fn val_slots_mut(&mut self) -> &mut [MaybeUninit<V>] {
        // SAFETY: As above, and `&mut self` gives exclusive access.
        unsafe { self.vals_ptr().as_mut() }
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the total slot count.
    ///
    /// Doubles on growth; fixed for tables over borrowed buffers.
    pub fn capacity(&self) -> usize {
        self.slots.capacity
    }

    /// Returns `true` if the table lives on borrowed buffers and cannot grow.
    pub fn is_fixed(&self) -> bool {
        matches!(self.backing, Backing::Borrowed)
    }

    /// Returns the hooks this table runs over its entries.
    pub fn hooks(&self) -> &Hooks<K, V> {
        &self.hooks
    }

    /// Returns the table's hash builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the status of the slot at `index`, or `None` past the end.
    pub fn status(&self, index: usize) -> Option<Status> {
        self.statuses().get(index).copied()
    }

    /// Returns the entry stored in the slot at `index`, if it is `Occupied`.
    ///
    /// Combined with [`find`](HashTable::find) this reads an entry by slot.
    pub fn slot(&self, index: usize) -> Option<(&K, &V)> {
        if self.status(index)? != Status::Occupied {
            return None;
        }

        // SAFETY: The slot is Occupied, so its key and value are initialized.
        unsafe {
            Some((
                self.key_slots()[index].assume_init_ref(),
                self.val_slots()[index].assume_init_ref(),
            ))
        }
    }

    /// Returns an iterator over the live entries in ascending slot order.
    ///
    /// Each call starts a fresh pass. The order reflects where entries
    /// happened to land and changes when the table grows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(1, "one");
    /// table.insert(2, "two");
    /// table.remove(&1);
    ///
    /// let entries: Vec<_> = table.iter().collect();
    /// assert_eq!(entries, [(&2, &"two")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            status: self.statuses(),
            keys: self.key_slots(),
            vals: self.val_slots(),
            index: 0,
            remaining: self.count,
        }
    }

    /// Returns an iterator over the live keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the live values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the live values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, V> {
        let remaining = self.count;
        // SAFETY: The status and value arrays are disjoint, and `&mut self`
        // keeps both borrowed for the iterator's lifetime.
        let (status, vals) = unsafe { (self.status_ptr().as_ref(), self.vals_ptr().as_mut()) };
        ValuesMut {
            inner: status.iter().zip(vals.iter_mut()),
            remaining,
        }
    }

    /// Removes every entry, running the drop hooks, and resets all slots,
    /// tombstones included, to `Empty`. The slot count is kept.
    pub fn clear(&mut self) {
        for index in 0..self.slots.capacity {
            if self.statuses()[index] != Status::Occupied {
                continue;
            }
            self.statuses_mut()[index] = Status::Empty;
            self.count -= 1;

            // SAFETY: The slot was Occupied and is now Empty, so it is read
            // out exactly once.
            let (key, value) = unsafe {
                (
                    self.key_slots()[index].assume_init_read(),
                    self.val_slots()[index].assume_init_read(),
                )
            };
            self.hooks.dispose(key, value);
        }

        self.statuses_mut().fill(Status::Empty);
        debug_assert_eq!(self.count, 0);
    }
}

impl<K, V, S, A> HashTable<'_, K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn home_index<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        (self.hash_builder.hash_one(key) % self.slots.capacity as u64) as usize
    }

    /// Returns the slot index holding `key`, or `None` if it is absent.
    ///
    /// The scan starts at the key's home slot, steps over tombstones and
    /// non-matching entries, and stops at the first `Empty` slot or after
    /// visiting every slot once.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::HashTable;
    /// # use probe_table::hasher::IdentityBuildHasher;
    /// #
    /// let mut table = HashTable::with_capacity_and_hasher(8, IdentityBuildHasher);
    /// table.insert(3u64, "three");
    /// table.insert(11u64, "eleven");
    ///
    /// assert_eq!(table.find(&3), Some(3));
    /// assert_eq!(table.find(&11), Some(4));
    /// assert_eq!(table.find(&19), None);
    /// ```
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.count == 0 {
            return None;
        }

        let capacity = self.slots.capacity;
        let start = self.home_index(key);
        let statuses = self.statuses();
        let keys = self.key_slots();

        let mut index = start;
        loop {
            match statuses[index] {
                Status::Empty => return None,
                // SAFETY: Occupied slots hold an initialized key.
                Status::Occupied
                    if <K as Borrow<Q>>::borrow(unsafe { keys[index].assume_init_ref() }) == key =>
                {
                    return Some(index);
                }
                Status::Occupied | Status::Tombstone => {}
            }

            index += 1;
            if index == capacity {
                index = 0;
            }
            if index == start {
                return None;
            }
        }
    }

    /// Returns `true` if the table holds `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Associates `value` with `key`, replacing any previous value.
    ///
    /// # Panics
    ///
    /// Panics if the table lives on borrowed buffers that are full and `key`
    /// is new, or if growth would overflow the address space. Allocation
    /// failure during growth goes to [`handle_alloc_error`].
    pub fn insert(&mut self, key: K, value: V) {
        if let Err(error) = self.try_insert(key, value) {
            fatal(error);
        }
    }

    /// Associates `value` with `key`, replacing any previous value, and
    /// reports failure instead of panicking.
    ///
    /// An allocator-backed table first doubles if its live entries reach
    /// [`MAX_FILL_PERCENT`] of its slots. An existing entry is overwritten
    /// in place: the new key and value are stored (through the clone hooks,
    /// if any) and the old ones are released (through the drop hooks, if
    /// any). A new entry takes the first `Empty` or `Tombstone` slot at or
    /// after its home slot.
    ///
    /// On error the table is unchanged and `key` and `value` are dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<()> {
        if !self.is_fixed() && self.count >= grow_threshold(self.slots.capacity) {
            self.grow()?;
        }

        if let Some(index) = self.find(&key) {
            let key = self.hooks.own_key(key);
            let value = self.hooks.own_val(value);

            // SAFETY: `find` only returns Occupied slots.
            let (old_key, old_value) = unsafe {
                (
                    core::mem::replace(self.key_slots_mut()[index].assume_init_mut(), key),
                    core::mem::replace(self.val_slots_mut()[index].assume_init_mut(), value),
                )
            };
            self.hooks.dispose(old_key, old_value);
            return Ok(());
        }

        if self.count == self.slots.capacity {
            return Err(Error::CapacityExhausted {
                capacity: self.slots.capacity,
            });
        }

        let home = self.home_index(&key);
        let key = self.hooks.own_key(key);
        let value = self.hooks.own_val(value);

        let index = probe_vacant(self.statuses(), home);
        self.key_slots_mut()[index].write(key);
        self.val_slots_mut()[index].write(value);
        self.statuses_mut()[index] = Status::Occupied;
        self.count += 1;

        Ok(())
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is absent; use [`try_get`](HashTable::try_get) when
    /// absence is expected.
    #[track_caller]
    pub fn get<Q>(&self, key: &Q) -> &V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.try_get(key) {
            Some(value) => value,
            None => panic!("key not found in table"),
        }
    }

    /// Returns a reference to the value for `key`, or `None` if absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert("cool", (6.9, 420));
    /// table.insert("cringe", (6.7, 67));
    /// table.remove("cringe");
    ///
    /// assert_eq!(table.try_get("cool"), Some(&(6.9, 420)));
    /// assert_eq!(table.try_get("cringe"), None);
    /// ```
    pub fn try_get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        // SAFETY: `find` only returns Occupied slots.
        Some(unsafe { self.val_slots()[index].assume_init_ref() })
    }

    /// Returns the stored key and value for `key`, or `None` if absent.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slot(self.find(key)?)
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is absent.
    #[track_caller]
    pub fn get_mut<Q>(&mut self, key: &Q) -> &mut V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.try_get_mut(key) {
            Some(value) => value,
            None => panic!("key not found in table"),
        }
    }

    /// Returns a mutable reference to the value for `key`, or `None` if
    /// absent.
    pub fn try_get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        // SAFETY: `find` only returns Occupied slots.
        Some(unsafe { self.val_slots_mut()[index].assume_init_mut() })
    }

    /// Returns an independently owned copy of the value for `key`, made by
    /// the value clone hook.
    ///
    /// # Panics
    ///
    /// Panics if the table has no value clone hook, or if `key` is absent.
    #[track_caller]
    pub fn get_copy<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.try_get_copy(key) {
            Some(value) => value,
            None => panic!("key not found in table"),
        }
    }

    /// Returns an independently owned copy of the value for `key`, made by
    /// the value clone hook, or `None` if absent.
    ///
    /// # Panics
    ///
    /// Panics if the table has no value clone hook, whether or not `key` is
    /// present.
    #[track_caller]
    pub fn try_get_copy<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(clone) = self.hooks.val_clone else {
            panic!("get_copy requires a table built with a value clone hook");
        };
        self.try_get(key).map(clone)
    }

    /// Removes `key`, releasing its key and value through the drop hooks.
    ///
    /// Returns `false`, leaving the table untouched, if `key` is absent.
    /// The vacated slot becomes a `Tombstone` until the next growth.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.remove_entry(key) {
            Some((key, value)) => {
                self.hooks.dispose(key, value);
                true
            }
            None => false,
        }
    }

    /// Removes `key` and hands its stored key and value to the caller
    /// without running the drop hooks.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        self.statuses_mut()[index] = Status::Tombstone;
        self.count -= 1;

        // SAFETY: The slot was Occupied and is now a Tombstone, so it is read
        // out exactly once.
        unsafe {
            Some((
                self.key_slots()[index].assume_init_read(),
                self.val_slots()[index].assume_init_read(),
            ))
        }
    }

    /// Doubles the slot count and moves every live entry to its place in the
    /// new arrays. Tombstones are not carried over.
    ///
    /// If hashing a key panics, the table keeps the new arrays with the
    /// entries moved so far; the rest are disposed of with the old block.
    #[cold]
    #[inline(never)]
    fn grow(&mut self) -> Result<()> {
        debug_assert!(!self.is_fixed());

        let old_capacity = self.slots.capacity;
        let new_capacity = old_capacity
            .checked_mul(2)
            .ok_or(Error::CapacityOverflow {
                capacity: old_capacity,
            })?;
        let (new_slots, new_backing) = allocate_slots::<K, V, A>(&self.allocator, new_capacity)?;

        // SAFETY: The old arrays stay allocated until `old` is dropped; these
        // slices are the only handles to them once `self.slots` is replaced.
        let (old_status, old_keys, old_vals) = unsafe {
            (
                self.status_ptr().as_mut(),
                self.keys_ptr().as_ref(),
                self.vals_ptr().as_ref(),
            )
        };
        let tombstones = old_status
            .iter()
            .filter(|s| **s == Status::Tombstone)
            .count();
        trace!(
            "growing table from {old_capacity} to {new_capacity} slots ({} live, {tombstones} tombstones dropped)",
            self.count
        );

        let old_backing = core::mem::replace(&mut self.backing, new_backing);
        let old = RetiredSlots {
            status: old_status,
            keys: old_keys,
            vals: old_vals,
            backing: old_backing,
            hooks: self.hooks,
            allocator: &self.allocator,
        };

        self.slots = new_slots;
        self.count = 0;
        // SAFETY: The new arrays were just allocated for `new_capacity` slots and
        // are reachable only through `self.slots`.
        let (status, keys, vals) = unsafe {
            (
                self.status_ptr().as_mut(),
                self.keys_ptr().as_mut(),
                self.vals_ptr().as_mut(),
            )
        };

        // Entries are moved, not cloned, so no hooks run here. Each old slot is
        // marked Empty only after its key hashed successfully, and `count`
        // tracks the entries already moved.
        for index in 0..old_capacity {
            if old.status[index] != Status::Occupied {
                continue;
            }

            // SAFETY: The slot is Occupied.
            let home = (self
                .hash_builder
                .hash_one(unsafe { old.keys[index].assume_init_ref() })
                % new_capacity as u64) as usize;
            old.status[index] = Status::Empty;
            // SAFETY: The slot was Occupied and is now Empty, so it is read out
            // exactly once.
            let (key, value) = unsafe {
                (
                    old.keys[index].assume_init_read(),
                    old.vals[index].assume_init_read(),
                )
            };

            let target = probe_vacant(status, home);
            keys[target].write(key);
            vals[target].write(value);
            status[target] = Status::Occupied;
            self.count += 1;
        }

        drop(old);
        Ok(())
    }

    /// Computes the probe-distance histogram of the live entries.
    ///
    /// Compiled with `cfg(test)` or the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let capacity = self.slots.capacity;
        let mut bins = alloc::vec::Vec::new();

        for index in 0..capacity {
            if self.statuses()[index] != Status::Occupied {
                continue;
            }
            // SAFETY: The slot is Occupied.
            let home = self.home_index(unsafe { self.key_slots()[index].assume_init_ref() });
            let distance = (index + capacity - home) % capacity;
            if bins.len() <= distance {
                bins.resize(distance + 1, 0);
            }
            bins[distance] += 1;
        }

        ProbeHistogram { bins }
    }

    /// Returns slot-level statistics for debugging.
    ///
    /// Compiled with `cfg(test)` or the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let mut occupied_slots = 0;
        let mut tombstones = 0;
        let mut empty_slots = 0;
        for status in self.statuses() {
            match status {
                Status::Empty => empty_slots += 1,
                Status::Occupied => occupied_slots += 1,
                Status::Tombstone => tombstones += 1,
            }
        }

        let total_bytes = match self.backing {
            Backing::Allocated { layout, .. } => layout.layout.size(),
            Backing::Borrowed => {
                self.slots.capacity
                    * (size_of::<Status>() + size_of::<K>() + size_of::<V>())
            }
        };

        DebugStats {
            populated: self.count,
            capacity: self.slots.capacity,
            occupied_slots,
            tombstones,
            empty_slots,
            load_factor: self.count as f64 / self.slots.capacity as f64,
            longest_probe: self.probe_histogram().bins.len().saturating_sub(1),
            total_bytes,
        }
    }
}

impl<K, V, S, A, Q> Index<&Q> for HashTable<'_, K, V, S, A>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    A: Allocator,
{
    type Output = V;

    /// Same as [`HashTable::get`].
    #[track_caller]
    fn index(&self, key: &Q) -> &V {
        self.get(key)
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashTable<'_, K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTable<'static, K, V, S, Global>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a HashTable<'_, K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`HashTable`], in slot order.
///
/// This struct is created by [`HashTable::iter`].
pub struct Iter<'a, K, V> {
    status: &'a [Status],
    keys: &'a [MaybeUninit<K>],
    vals: &'a [MaybeUninit<V>],
    index: usize,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            keys: self.keys,
            vals: self.vals,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.status.len() {
            let index = self.index;
            self.index += 1;

            if self.status[index] == Status::Occupied {
                self.remaining -= 1;
                // SAFETY: Occupied slots hold an initialized key and value.
                return Some(unsafe {
                    (
                        self.keys[index].assume_init_ref(),
                        self.vals[index].assume_init_ref(),
                    )
                });
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An iterator over the keys of a [`HashTable`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// An iterator over the values of a [`HashTable`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A mutable iterator over the values of a [`HashTable`].
pub struct ValuesMut<'a, V> {
    inner: core::iter::Zip<core::slice::Iter<'a, Status>, core::slice::IterMut<'a, MaybeUninit<V>>>,
    remaining: usize,
}

impl<'a, V> Iterator for ValuesMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        for (status, value) in &mut self.inner {
            if *status == Status::Occupied {
                self.remaining -= 1;
                // SAFETY: Occupied slots hold an initialized value.
                return Some(unsafe { value.assume_init_mut() });
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for ValuesMut<'_, V> {}

impl<V> FusedIterator for ValuesMut<'_, V> {}

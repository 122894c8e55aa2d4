//! Ownership hooks run by a table over the lifetime of its entries.
//!
//! A table built with [`Hooks::none`] stores keys and values exactly as they
//! are handed over and drops them normally. A managed table runs the clone
//! hooks on every insert, so the stored entry never aliases storage the
//! caller still controls, and routes every disposal (overwrite, removal,
//! clear, teardown) through the drop hooks.

use core::fmt::Debug;

/// Per-table clone and drop hooks for keys and values.
pub struct Hooks<K, V> {
    pub(crate) key_clone: Option<fn(&K) -> K>,
    pub(crate) key_drop: Option<fn(K)>,
    pub(crate) val_clone: Option<fn(&V) -> V>,
    pub(crate) val_drop: Option<fn(V)>,
}

impl<K, V> Clone for Hooks<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Hooks<K, V> {}

impl<K, V> Default for Hooks<K, V> {
    fn default() -> Self {
        Self::none()
    }
}

impl<K, V> Debug for Hooks<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hooks")
            .field("key_clone", &self.key_clone.is_some())
            .field("key_drop", &self.key_drop.is_some())
            .field("val_clone", &self.val_clone.is_some())
            .field("val_drop", &self.val_drop.is_some())
            .finish()
    }
}

impl<K, V> Hooks<K, V> {
    /// No hooks: entries are moved in and dropped normally.
    pub const fn none() -> Self {
        Self {
            key_clone: None,
            key_drop: None,
            val_clone: None,
            val_drop: None,
        }
    }

    /// All four hooks supplied explicitly.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::Hooks;
    ///
    /// fn release(s: String) {
    ///     drop(s);
    /// }
    ///
    /// let hooks: Hooks<String, String> = Hooks::new(String::clone, release, String::clone, release);
    /// assert!(hooks.is_managed());
    /// ```
    pub const fn new(
        key_clone: fn(&K) -> K,
        key_drop: fn(K),
        val_clone: fn(&V) -> V,
        val_drop: fn(V),
    ) -> Self {
        Self {
            key_clone: Some(key_clone),
            key_drop: Some(key_drop),
            val_clone: Some(val_clone),
            val_drop: Some(val_drop),
        }
    }

    /// Sets the key clone hook.
    pub const fn with_key_clone(mut self, hook: fn(&K) -> K) -> Self {
        self.key_clone = Some(hook);
        self
    }

    /// Sets the key drop hook.
    pub const fn with_key_drop(mut self, hook: fn(K)) -> Self {
        self.key_drop = Some(hook);
        self
    }

    /// Sets the value clone hook.
    pub const fn with_val_clone(mut self, hook: fn(&V) -> V) -> Self {
        self.val_clone = Some(hook);
        self
    }

    /// Sets the value drop hook.
    pub const fn with_val_drop(mut self, hook: fn(V)) -> Self {
        self.val_drop = Some(hook);
        self
    }

    /// Returns `true` if all four hooks are present.
    pub const fn is_managed(&self) -> bool {
        self.key_clone.is_some()
            && self.key_drop.is_some()
            && self.val_clone.is_some()
            && self.val_drop.is_some()
    }

    /// Returns `true` if a value clone hook is present, which `get_copy`
    /// requires.
    pub const fn has_val_clone(&self) -> bool {
        self.val_clone.is_some()
    }

    #[inline]
    pub(crate) fn own_key(&self, key: K) -> K {
        match self.key_clone {
            Some(clone) => clone(&key),
            None => key,
        }
    }

    #[inline]
    pub(crate) fn own_val(&self, value: V) -> V {
        match self.val_clone {
            Some(clone) => clone(&value),
            None => value,
        }
    }

    #[inline]
    pub(crate) fn dispose(&self, key: K, value: V) {
        match self.key_drop {
            Some(release) => release(key),
            None => drop(key),
        }
        match self.val_drop {
            Some(release) => release(value),
            None => drop(value),
        }
    }
}

impl<K, V> Hooks<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Clone hooks from [`Clone`], drop hooks from [`drop`].
    pub fn managed() -> Self {
        Self::new(K::clone, drop, V::clone, drop)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use core::cell::Cell;

    use super::*;

    std::thread_local! {
        static RELEASED: Cell<usize> = const { Cell::new(0) };
    }

    fn count_release(_: String) {
        RELEASED.with(|c| c.set(c.get() + 1));
    }

    #[test]
    fn none_moves_through() {
        let hooks: Hooks<String, String> = Hooks::none();
        assert!(!hooks.is_managed());
        assert!(!hooks.has_val_clone());

        let key = "key".to_string();
        let ptr = key.as_ptr();
        assert_eq!(hooks.own_key(key).as_ptr(), ptr);
    }

    #[test]
    fn managed_copies() {
        let hooks: Hooks<String, String> = Hooks::managed();
        assert!(hooks.is_managed());

        let value = "value".to_string();
        let ptr = value.as_ptr();
        let owned = hooks.own_val(value);
        assert_eq!(owned, "value");
        assert_ne!(owned.as_ptr(), ptr);
    }

    #[test]
    fn dispose_runs_drop_hooks() {
        RELEASED.with(|c| c.set(0));
        let hooks: Hooks<String, String> = Hooks::none()
            .with_key_drop(count_release)
            .with_val_drop(count_release);
        hooks.dispose("k".to_string(), "v".to_string());
        assert_eq!(RELEASED.with(Cell::get), 2);

        let partial: Hooks<String, String> = Hooks::none().with_val_drop(count_release);
        partial.dispose("k".to_string(), "v".to_string());
        assert_eq!(RELEASED.with(Cell::get), 3);
    }
}

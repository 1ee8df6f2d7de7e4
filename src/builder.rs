//! Construction-time configuration for [`ChainedHashTable`].

use crate::chained_hash_table::{ChainedHashTable, Disposer, MAX_CHAIN_LENGTH};
use crate::error::TableError;

/// Collects the mandatory strategies and optional settings of a table.
///
/// ```
/// use chained_hashtable::{StringContent, TableBuilder};
///
/// let table = TableBuilder::<String, u32, _, _>::new(StringContent, StringContent)
///     .min_capacity(200)
///     .build()
///     .unwrap();
/// assert_eq!(table.capacity(), 255);
/// ```
pub struct TableBuilder<K, V, H, E> {
    pub(crate) hasher: H,
    pub(crate) equality: E,
    pub(crate) key_disposer: Option<Disposer<K>>,
    pub(crate) value_disposer: Option<Disposer<V>>,
    pub(crate) min_capacity: usize,
    pub(crate) max_chain_length: usize,
}

impl<K, V, H, E> TableBuilder<K, V, H, E> {
    pub fn new(hasher: H, equality: E) -> Self {
        Self {
            hasher,
            equality,
            key_disposer: None,
            value_disposer: None,
            min_capacity: 0,
            max_chain_length: MAX_CHAIN_LENGTH,
        }
    }

    /// Hand every key leaving the table (replacement, removal, clear, drop)
    /// to `f` instead of dropping it.
    pub fn key_disposer<F>(mut self, f: F) -> Self
    where
        F: FnMut(K) + 'static,
    {
        self.key_disposer = Some(Box::new(f));
        self
    }

    /// Same as [`key_disposer`](Self::key_disposer), for values.
    pub fn value_disposer<F>(mut self, f: F) -> Self
    where
        F: FnMut(V) + 'static,
    {
        self.value_disposer = Some(Box::new(f));
        self
    }

    /// Minimum number of bucket slots, rounded up to a power of two.
    /// Zero (the default) keeps the default of 64 slots.
    pub fn min_capacity(mut self, slots: usize) -> Self {
        self.min_capacity = slots;
        self
    }

    /// Average entries per occupied bucket tolerated before the table grows.
    /// Values below 1 are clamped to 1.
    pub fn max_chain_length(mut self, n: usize) -> Self {
        self.max_chain_length = n.max(1);
        self
    }

    pub fn build(self) -> Result<ChainedHashTable<K, V, H, E>, TableError> {
        ChainedHashTable::from_builder(self)
    }
}

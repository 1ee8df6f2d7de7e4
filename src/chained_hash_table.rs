//! ChainedHashTable: separately chained buckets over a node arena.
//!
//! Nodes live in a generational `SlotMap`; each bucket head and each
//! `next` link is a slot key rather than a pointer. The bucket array always
//! has a power-of-two length so a hash maps to its bucket with a single AND
//! against `capacity` (length minus one).
//!
//! The structural state (`Chains`) is kept apart from the strategies and
//! disposers so that guarded sections can borrow it mutably while the
//! reentrancy guard and the equality strategy are borrowed alongside.

use crate::builder::TableBuilder;
use crate::error::TableError;
use crate::reentrancy::DebugReentrancy;
use crate::strategy::{KeyEquality, KeyHasher, StdEq, StdHash};
use core::borrow::Borrow;
use core::fmt;
use core::mem;
use log::{debug, trace, warn};
use slotmap::{DefaultKey, SlotMap};

/// Bucket mask used when no capacity hint is given (64 slots).
pub const DEFAULT_CAPACITY: usize = 63;

/// Default growth threshold: average entries per occupied bucket.
pub const MAX_CHAIN_LENGTH: usize = 10;

/// Hook receiving keys or values as they leave the table.
pub type Disposer<T> = Box<dyn FnMut(T)>;

/// Stable reference to one key/value pair. Survives growth and in-place
/// replacement; stops resolving once the pair is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, K, V, H, E>(&self, table: &'a ChainedHashTable<K, V, H, E>) -> Option<&'a K> {
        table.handle_key(*self)
    }

    pub fn value<'a, K, V, H, E>(&self, table: &'a ChainedHashTable<K, V, H, E>) -> Option<&'a V> {
        table.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, H, E>(
        &self,
        table: &'a mut ChainedHashTable<K, V, H, E>,
    ) -> Option<&'a mut V> {
        table.handle_value_mut(*self)
    }

    /// Key and value together, the view `set` hands back.
    pub fn pair<'a, K, V, H, E>(
        &self,
        table: &'a ChainedHashTable<K, V, H, E>,
    ) -> Option<(&'a K, &'a V)> {
        table.handle_pair(*self)
    }
}

#[derive(Debug)]
struct ChainNode<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<DefaultKey>,
}

/// Occupancy snapshot, gathered by walking every chain.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TableStats {
    pub buckets: usize,
    pub occupied_buckets: usize,
    pub entries: usize,
    pub longest_chain: usize,
}

fn allocate_buckets(slots: usize) -> Result<Vec<Option<DefaultKey>>, TableError> {
    let mut heads = Vec::new();
    heads.try_reserve_exact(slots)?;
    heads.resize(slots, None);
    Ok(heads)
}

fn mask_for_hint(min_capacity: usize) -> Result<usize, TableError> {
    if min_capacity == 0 {
        return Ok(DEFAULT_CAPACITY);
    }
    let slots = min_capacity
        .checked_next_power_of_two()
        .ok_or(TableError::CapacityOverflow)?;
    // A single slot would give a zero mask; fall back to the default.
    if slots < 2 {
        return Ok(DEFAULT_CAPACITY);
    }
    Ok(slots - 1)
}

fn dispose<K, V>(
    key_disposer: &mut Option<Disposer<K>>,
    value_disposer: &mut Option<Disposer<V>>,
    key: K,
    value: V,
) {
    match key_disposer {
        Some(f) => f(key),
        None => drop(key),
    }
    match value_disposer {
        Some(f) => f(value),
        None => drop(value),
    }
}

/// Bucket heads, node arena and the counters derived from them.
struct Chains<K, V> {
    buckets: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, ChainNode<K, V>>,
    size: usize,
    occupied: usize,
    // Set by a resize that spread nothing.
    growth_stalled_at: Option<GrowthStall>,
}

/// Counters recorded when a resize left occupancy unchanged. Growth waits
/// until occupancy exceeds `occupied` or `size` reaches twice `size`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct GrowthStall {
    occupied: usize,
    size: usize,
}

impl GrowthStall {
    fn holds(&self, occupied: usize, size: usize) -> bool {
        occupied <= self.occupied && size < self.size.saturating_mul(2)
    }
}

impl<K, V> Chains<K, V> {
    fn with_buckets(buckets: Vec<Option<DefaultKey>>) -> Self {
        Self {
            buckets,
            nodes: SlotMap::with_key(),
            size: 0,
            occupied: 0,
            growth_stalled_at: None,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buckets.len() - 1
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & self.capacity()
    }

    fn node(&self, k: DefaultKey) -> &ChainNode<K, V> {
        &self.nodes[k]
    }

    /// Walk the chain at `bucket` for a key equal to `q`.
    /// Returns the predecessor (if any) and the matching node.
    fn locate<Q, E>(
        &self,
        equality: &E,
        bucket: usize,
        hash: u64,
        q: &Q,
    ) -> Option<(Option<DefaultKey>, DefaultKey)>
    where
        K: Borrow<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        let mut prev = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = self.node(k);
            if node.hash == hash && equality.keys_equal(node.key.borrow(), q) {
                return Some((prev, k));
            }
            prev = cur;
            cur = node.next;
        }
        None
    }

    /// Bucket and predecessor of a live node, found by its stored hash.
    fn position_of(&self, target: DefaultKey) -> Option<(usize, Option<DefaultKey>)> {
        let bucket = self.bucket_index(self.nodes.get(target)?.hash);
        let mut prev = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            if k == target {
                return Some((bucket, prev));
            }
            prev = cur;
            cur = self.node(k).next;
        }
        None
    }

    fn link_head(&mut self, bucket: usize, key: K, value: V, hash: u64) -> DefaultKey {
        let head = self.buckets[bucket];
        let k = self.nodes.insert(ChainNode {
            key,
            value,
            hash,
            next: head,
        });
        if head.is_none() {
            self.occupied += 1;
        }
        self.buckets[bucket] = Some(k);
        self.size += 1;
        k
    }

    /// Unlink `k` from `bucket` given its predecessor, keeping counters in step.
    fn detach(
        &mut self,
        bucket: usize,
        prev: Option<DefaultKey>,
        k: DefaultKey,
    ) -> Option<ChainNode<K, V>> {
        let node = self.nodes.remove(k)?;
        match prev {
            None => self.buckets[bucket] = node.next,
            Some(p) => {
                if let Some(pn) = self.nodes.get_mut(p) {
                    pn.next = node.next;
                }
            }
        }
        if self.buckets[bucket].is_none() {
            self.occupied -= 1;
        }
        self.size -= 1;
        Some(node)
    }

    /// Empty every bucket and zero the counters; nodes are left to the caller.
    /// A growth stall survives, since the capacity it was measured at does.
    fn unlink_all(&mut self) {
        self.buckets.iter_mut().for_each(|head| *head = None);
        self.size = 0;
        self.occupied = 0;
    }

    /// Grow when `size` exceeds `occupied * max_chain_length`.
    ///
    /// The new head array is allocated before anything is relinked, so a
    /// failed allocation leaves the chains untouched.
    fn grow_if_needed(&mut self, max_chain_length: usize) -> Result<(), TableError> {
        let size = self.size;
        if size <= self.occupied.saturating_mul(max_chain_length) {
            return Ok(());
        }
        if let Some(stall) = self.growth_stalled_at {
            if stall.holds(self.occupied, size) {
                return Ok(());
            }
        }

        let old_capacity = self.capacity();
        let slots = self
            .buckets
            .len()
            .checked_mul(2)
            .ok_or(TableError::CapacityOverflow)?;
        let new_capacity = slots - 1;
        let mut heads = allocate_buckets(slots).map_err(|e| {
            warn!(
                "growth from {} to {} buckets failed: {}",
                old_capacity + 1,
                slots,
                e
            );
            e
        })?;

        let mut occupied = 0;
        for head in self.buckets.iter_mut() {
            let mut cur = head.take();
            while let Some(k) = cur {
                let node = &mut self.nodes[k];
                cur = node.next;
                let b = (node.hash as usize) & new_capacity;
                if heads[b].is_none() {
                    occupied += 1;
                }
                node.next = heads[b];
                heads[b] = Some(k);
            }
        }

        let before = self.occupied;
        self.buckets = heads;
        self.occupied = occupied;
        debug!(
            "resized chained table: capacity {} -> {}, {} entries over {} buckets (was {})",
            old_capacity,
            new_capacity,
            self.nodes.len(),
            occupied,
            before
        );

        // Hashes that differ only in high bits need several doublings before
        // a resize spreads them, so a stall only lasts until size doubles.
        self.growth_stalled_at = if occupied == before {
            trace!(
                "resize did not spread beyond {} buckets at size {}; growth waits for size {}",
                occupied,
                size,
                size.saturating_mul(2)
            );
            Some(GrowthStall { occupied, size })
        } else {
            None
        };
        Ok(())
    }

    fn stats(&self) -> TableStats {
        let mut stats = TableStats {
            buckets: self.buckets.len(),
            ..TableStats::default()
        };
        for &head in &self.buckets {
            let mut chain = 0;
            let mut cur = head;
            while let Some(k) = cur {
                chain += 1;
                cur = self.node(k).next;
            }
            if chain > 0 {
                stats.occupied_buckets += 1;
                stats.entries += chain;
                stats.longest_chain = stats.longest_chain.max(chain);
            }
        }
        stats
    }
}

/// Separately chained hash table with injected hash/equality strategies.
///
/// Iteration and traversal visit buckets in array order and each chain
/// most-recent-first. That order is not insertion order and changes
/// whenever the table grows.
pub struct ChainedHashTable<K, V, H = StdHash, E = StdEq> {
    hasher: H,
    equality: E,
    chains: Chains<K, V>,
    max_chain_length: usize,
    key_disposer: Option<Disposer<K>>,
    value_disposer: Option<Disposer<V>>,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashTable<K, V> {
    pub fn new() -> Self {
        Self::with_strategies(StdHash::default(), StdEq)
    }
}

impl<K, V> Default for ChainedHashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H, E> ChainedHashTable<K, V, H, E> {
    /// Table with the default 64 bucket slots and no disposers.
    pub fn with_strategies(hasher: H, equality: E) -> Self {
        Self {
            hasher,
            equality,
            chains: Chains::with_buckets(vec![None; DEFAULT_CAPACITY + 1]),
            max_chain_length: MAX_CHAIN_LENGTH,
            key_disposer: None,
            value_disposer: None,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn builder(hasher: H, equality: E) -> TableBuilder<K, V, H, E> {
        TableBuilder::new(hasher, equality)
    }

    pub(crate) fn from_builder(b: TableBuilder<K, V, H, E>) -> Result<Self, TableError> {
        let mask = mask_for_hint(b.min_capacity)?;
        let slots = mask.checked_add(1).ok_or(TableError::CapacityOverflow)?;
        let buckets = allocate_buckets(slots).map_err(|e| {
            warn!("could not allocate {} bucket slots: {}", slots, e);
            e
        })?;
        Ok(Self {
            hasher: b.hasher,
            equality: b.equality,
            chains: Chains::with_buckets(buckets),
            max_chain_length: b.max_chain_length.max(1),
            key_disposer: b.key_disposer,
            value_disposer: b.value_disposer,
            reentrancy: DebugReentrancy::new(),
        })
    }

    /// Number of distinct entries (nodes across all chains).
    pub fn len(&self) -> usize {
        self.chains.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chains.nodes.is_empty()
    }

    /// The `set` counter: incremented by every `set`, including one that
    /// replaces an existing key, and decremented by each removal. It only
    /// equals [`len`](Self::len) while no replacement has happened since
    /// the last `clear`. Growth is measured against this counter.
    pub fn size(&self) -> usize {
        self.chains.size
    }

    /// Bucket mask, always `2^k - 1`.
    pub fn capacity(&self) -> usize {
        self.chains.capacity()
    }
    pub fn bucket_count(&self) -> usize {
        self.chains.buckets.len()
    }
    pub fn occupied_buckets(&self) -> usize {
        self.chains.occupied
    }
    pub fn max_chain_length(&self) -> usize {
        self.max_chain_length
    }

    pub fn stats(&self) -> TableStats {
        self.chains.stats()
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        self.chains.nodes.get(h.raw_handle()).map(|n| &n.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        self.chains.nodes.get(h.raw_handle()).map(|n| &n.value)
    }

    pub(crate) fn handle_pair(&self, h: Handle) -> Option<(&K, &V)> {
        self.chains
            .nodes
            .get(h.raw_handle())
            .map(|n| (&n.key, &n.value))
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.chains
            .nodes
            .get_mut(h.raw_handle())
            .map(|n| &mut n.value)
    }

    /// Remove the pair behind `handle` and hand it back without running
    /// disposers. Stale handles yield `None`.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let target = handle.raw_handle();
        let (bucket, prev) = self.chains.position_of(target)?;
        self.chains
            .detach(bucket, prev, target)
            .map(|n| (n.key, n.value))
    }

    /// Dispose of every entry and empty every bucket. Capacity is kept.
    pub fn clear(&mut self) {
        {
            let _g = self.reentrancy.enter();
            self.chains.unlink_all();
        }
        // drain() keeps slot generations, so handles from before stay stale.
        for (_, node) in self.chains.nodes.drain() {
            dispose(
                &mut self.key_disposer,
                &mut self.value_disposer,
                node.key,
                node.value,
            );
        }
    }

    /// Release the table and everything in it, running disposers.
    pub fn destroy(self) {
        drop(self)
    }

    /// Call `visit` on each pair until it returns `Some`, and return that.
    pub fn traverse<R, F>(&self, mut visit: F) -> Option<R>
    where
        F: FnMut(&K, &V) -> Option<R>,
    {
        self.iter().find_map(|(_, k, v)| visit(k, v))
    }

    /// Like [`traverse`](Self::traverse) with mutable access to values.
    pub fn traverse_mut<R, F>(&mut self, mut visit: F) -> Option<R>
    where
        F: FnMut(&K, &mut V) -> Option<R>,
    {
        let Chains { buckets, nodes, .. } = &mut self.chains;
        for &head in buckets.iter() {
            let mut cur = head;
            while let Some(k) = cur {
                let node = &mut nodes[k];
                cur = node.next;
                if let Some(r) = visit(&node.key, &mut node.value) {
                    return Some(r);
                }
            }
        }
        None
    }

    /// Pairs in bucket order, then chain order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            heads: self.chains.buckets.iter(),
            nodes: &self.chains.nodes,
            cursor: None,
            remaining: self.chains.nodes.len(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(_, k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, _, v)| v)
    }

    /// Mutable pairs in arena order, which is unrelated to bucket order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.chains.nodes.iter_mut(),
        }
    }

    fn find_key<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_key(q);
        let bucket = self.chains.bucket_index(hash);
        self.chains
            .locate(&self.equality, bucket, hash, q)
            .map(|(_, k)| k)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        self.find_key(q).map(Handle::new)
    }

    /// Value stored under `q`. Absence is `None`; a stored `V` is always
    /// `Some`, even when `V` itself is an `Option`.
    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        let k = self.find_key(q)?;
        Some(&self.chains.node(k).value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        let k = self.find_key(q)?;
        self.chains.nodes.get_mut(k).map(|n| &mut n.value)
    }

    /// Stored key and value for `q`.
    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        let k = self.find_key(q)?;
        let node = self.chains.node(k);
        Some((&node.key, &node.value))
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        self.find_key(q).is_some()
    }

    /// Unlink the entry for `q` and return it; disposers do not run.
    pub fn take<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_key(q);
        let bucket = self.chains.bucket_index(hash);
        let (prev, k) = self.chains.locate(&self.equality, bucket, hash, q)?;
        self.chains
            .detach(bucket, prev, k)
            .map(|n| (n.key, n.value))
    }

    /// Remove and dispose of the entry for `q`. Returns `false`, leaving
    /// the table unchanged, when no such entry exists.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEquality<Q>,
        Q: ?Sized,
    {
        match self.take(q) {
            Some((key, value)) => {
                dispose(
                    &mut self.key_disposer,
                    &mut self.value_disposer,
                    key,
                    value,
                );
                true
            }
            None => false,
        }
    }
}

impl<K, V, H, E> ChainedHashTable<K, V, H, E>
where
    H: KeyHasher<K>,
    E: KeyEquality<K>,
{
    /// Map `key` to `value`.
    ///
    /// A new key is linked at the head of its chain. An existing key keeps
    /// its node, chain position and handle; the old key and value are
    /// passed to the disposers once the table is consistent again. Either
    /// way the [`size`](Self::size) counter increments.
    ///
    /// Growth is checked before the lookup. If growth fails, nothing is
    /// inserted and the table is unchanged.
    pub fn set(&mut self, key: K, value: V) -> Result<Handle, TableError> {
        let (handle, displaced) = {
            let _g = self.reentrancy.enter();
            self.chains.grow_if_needed(self.max_chain_length)?;
            let hash = self.hasher.hash_key(&key);
            let bucket = self.chains.bucket_index(hash);
            match self.chains.locate(&self.equality, bucket, hash, &key) {
                Some((_, k)) => {
                    let node = &mut self.chains.nodes[k];
                    let old_key = mem::replace(&mut node.key, key);
                    let old_value = mem::replace(&mut node.value, value);
                    node.hash = hash;
                    self.chains.size += 1;
                    (Handle::new(k), Some((old_key, old_value)))
                }
                None => {
                    let k = self.chains.link_head(bucket, key, value, hash);
                    (Handle::new(k), None)
                }
            }
        };
        if let Some((old_key, old_value)) = displaced {
            dispose(
                &mut self.key_disposer,
                &mut self.value_disposer,
                old_key,
                old_value,
            );
        }
        Ok(handle)
    }
}

impl<K, V, H, E> Drop for ChainedHashTable<K, V, H, E> {
    fn drop(&mut self) {
        if self.key_disposer.is_none() && self.value_disposer.is_none() {
            return;
        }
        for (_, node) in self.chains.nodes.drain() {
            dispose(
                &mut self.key_disposer,
                &mut self.value_disposer,
                node.key,
                node.value,
            );
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H, E> fmt::Debug for ChainedHashTable<K, V, H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

/// Iterator over pairs in bucket order, then chain order.
pub struct Iter<'a, K, V> {
    heads: core::slice::Iter<'a, Option<DefaultKey>>,
    nodes: &'a SlotMap<DefaultKey, ChainNode<K, V>>,
    cursor: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.cursor {
                let node = self.nodes.get(k)?;
                self.cursor = node.next;
                self.remaining -= 1;
                return Some((Handle::new(k), &node.key, &node.value));
            }
            self.cursor = *self.heads.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over pairs with mutable values.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, ChainNode<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Handle, &'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, n)| (Handle::new(k), &n.key, &mut n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

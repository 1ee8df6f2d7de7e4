//! chained-hashtable: a separately chained hash table whose key hashing,
//! key equality and entry disposal are supplied by the caller.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a general-purpose map that works for keys whose identity is not
//!   `Hash + Eq`: raw addresses, integers by value, strings by content, or
//!   anything a closure can describe.
//! - Layers:
//!   - `murmur`: MurmurHash2 over byte slices, the mixing function behind
//!     the built-in strategies.
//!   - `strategy`: `KeyHasher`/`KeyEquality` traits plus the built-in
//!     pointer, integer and string strategies and adapters for std traits
//!     and closures.
//!   - `ChainedHashTable<K, V, H, E>`: bucket heads over a generational
//!     node arena, with growth driven by the average chain length.
//!   - `TableBuilder`: construction-time settings (capacity hint, growth
//!     threshold, disposers).
//!
//! Constraints
//! - Single-threaded: tables are `!Send`/`!Sync`.
//! - Bucket count is always a power of two; `capacity()` is the mask.
//! - One node per distinct key (as decided by the equality strategy).
//!   Setting an existing key replaces its pair in place.
//! - Growth doubles the bucket array when
//!   `size > occupied_buckets * max_chain_length`, checked before each
//!   `set`. A resize that leaves occupancy unchanged suspends growth until
//!   occupancy rises or `size` doubles. Hashes that differ only above the
//!   current mask still get the doublings that eventually spread them,
//!   while a constant hash costs one doubling per doubling of `size`
//!   instead of one per insert.
//!
//! Hashing invariants
//! - Each node stores the hash computed when it was set. Rehashing on
//!   growth uses the stored value; the hash strategy is never called for
//!   keys already in the table.
//! - Lookups compare stored hashes before asking the equality strategy.
//!   Strategies must agree: equal keys hash equally.
//!
//! Reentrancy policy
//! - Hash and equality strategies run while chains are being walked. A
//!   debug-only guard panics if they call back into the same table.
//! - Disposers run only after the structure is consistent again, so they
//!   may do anything except touch the table they belong to (which the
//!   borrow checker already forbids).
//!
//! Size accounting
//! - `len()` counts nodes. `size()` is the historical `set` counter: it
//!   increments on every `set`, replacements included, and decrements on
//!   every removal. It drives growth, so repeatedly replacing one key
//!   still grows the table. Use `len()` to count entries.

mod builder;
mod chained_hash_table;
mod chained_hash_table_proptest;
mod error;
pub mod murmur;
mod reentrancy;
pub mod strategy;

// Public surface
pub use builder::TableBuilder;
pub use chained_hash_table::{
    ChainedHashTable, Disposer, Handle, Iter, IterMut, TableStats, DEFAULT_CAPACITY,
    MAX_CHAIN_LENGTH,
};
pub use error::TableError;
pub use strategy::{
    FnEquality, FnHasher, IntegerValue, KeyEquality, KeyHasher, PointerIdentity, StdEq, StdHash,
    StringContent,
};

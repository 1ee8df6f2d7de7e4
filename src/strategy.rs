//! Hash and equality strategies injected into a [`ChainedHashTable`].
//!
//! A table is parameterized by one [`KeyHasher`] and one [`KeyEquality`].
//! The two must agree: keys that compare equal must hash equally. Lookups
//! by a borrowed form `Q` of the key (`K: Borrow<Q>`) additionally require
//! the strategies to be implemented for `Q` and to give the same answers
//! for `k` and `k.borrow()`.
//!
//! The built-in strategies are stateless (except [`StdHash`], which carries
//! its `BuildHasher`) and can be constructed wherever they are needed.
//!
//! [`ChainedHashTable`]: crate::ChainedHashTable

use crate::murmur::hash_bytes;
use core::hash::{BuildHasher, Hash};
use core::ops::Deref;
use std::collections::hash_map::RandomState;

/// Maps a key to a 64-bit hash. Only the low bits survive bucket masking,
/// so implementations should mix well.
pub trait KeyHasher<K: ?Sized> {
    fn hash_key(&self, key: &K) -> u64;
}

/// Decides whether two keys denote the same entry.
pub trait KeyEquality<K: ?Sized> {
    fn keys_equal(&self, a: &K, b: &K) -> bool;
}

/// Identity of the pointee: two keys are equal iff they point at the same
/// address. Works for any pointer-like key (`&T`, `Box<T>`, `Rc<T>`, ...).
#[derive(Copy, Clone, Debug, Default)]
pub struct PointerIdentity;

#[inline]
fn address_of<P: Deref + ?Sized>(p: &P) -> usize {
    (&**p as *const P::Target).cast::<()>() as usize
}

impl<P: Deref + ?Sized> KeyHasher<P> for PointerIdentity {
    #[inline]
    fn hash_key(&self, key: &P) -> u64 {
        hash_bytes(&address_of(key).to_ne_bytes())
    }
}

impl<P: Deref + ?Sized> KeyEquality<P> for PointerIdentity {
    #[inline]
    fn keys_equal(&self, a: &P, b: &P) -> bool {
        address_of(a) == address_of(b)
    }
}

/// Integer keys compared by value and hashed over their little-endian bytes.
#[derive(Copy, Clone, Debug, Default)]
pub struct IntegerValue;

macro_rules! integer_value_impls {
    ($($t:ty),* $(,)?) => {$(
        impl KeyHasher<$t> for IntegerValue {
            #[inline]
            fn hash_key(&self, key: &$t) -> u64 {
                hash_bytes(&key.to_le_bytes())
            }
        }

        impl KeyEquality<$t> for IntegerValue {
            #[inline]
            fn keys_equal(&self, a: &$t, b: &$t) -> bool {
                a == b
            }
        }
    )*};
}

integer_value_impls!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// String keys compared by content (case-sensitive) and hashed over their
/// UTF-8 bytes. `String`, `&str`, `Box<str>` and `Rc<str>` keys all hash
/// the same for the same text, so `str` queries work against any of them.
#[derive(Copy, Clone, Debug, Default)]
pub struct StringContent;

impl<K: AsRef<str> + ?Sized> KeyHasher<K> for StringContent {
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        hash_bytes(key.as_ref().as_bytes())
    }
}

impl<K: AsRef<str> + ?Sized> KeyEquality<K> for StringContent {
    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

/// Adapter over `core::hash::Hash` and a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct StdHash<S = RandomState>(pub S);

impl<K: Hash + ?Sized, S: BuildHasher> KeyHasher<K> for StdHash<S> {
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.0.hash_one(key)
    }
}

/// Adapter over `Eq`.
#[derive(Copy, Clone, Debug, Default)]
pub struct StdEq;

impl<K: Eq + ?Sized> KeyEquality<K> for StdEq {
    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Closure-backed hasher, for one-off key types.
#[derive(Copy, Clone, Debug)]
pub struct FnHasher<F>(pub F);

impl<K: ?Sized, F: Fn(&K) -> u64> KeyHasher<K> for FnHasher<F> {
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        (self.0)(key)
    }
}

/// Closure-backed equality, for one-off key types.
#[derive(Copy, Clone, Debug)]
pub struct FnEquality<F>(pub F);

impl<K: ?Sized, F: Fn(&K, &K) -> bool> KeyEquality<K> for FnEquality<F> {
    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        (self.0)(a, b)
    }
}

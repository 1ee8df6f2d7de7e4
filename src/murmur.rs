//! Byte-range hashing used by the built-in key strategies.
//!
//! The primitive is MurmurHash2 with a zero seed: the 64A variant on
//! 64-bit targets and the classic 32-bit variant elsewhere. Input words are
//! read little-endian so a given byte string hashes to the same value on
//! every host of the same pointer width.

const M64: u64 = 0xc6a4_a793_5bd1_e995;
const R64: u32 = 47;

const M32: u32 = 0x5bd1_e995;
const R32: u32 = 24;

/// MurmurHash64A over `data` with seed 0.
pub fn murmur2_64a(data: &[u8]) -> u64 {
    let mut h = (data.len() as u64).wrapping_mul(M64);

    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        let mut k = u64::from_le_bytes(word);
        k = k.wrapping_mul(M64);
        k ^= k >> R64;
        k = k.wrapping_mul(M64);
        h ^= k;
        h = h.wrapping_mul(M64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M64);
    }

    h ^= h >> R64;
    h = h.wrapping_mul(M64);
    h ^= h >> R64;
    h
}

/// Classic 32-bit MurmurHash2 over `data` with seed 0.
pub fn murmur2_32(data: &[u8]) -> u32 {
    let mut h = data.len() as u32;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut word = [0u8; 4];
        word.copy_from_slice(chunk);
        let mut k = u32::from_le_bytes(word);
        k = k.wrapping_mul(M32);
        k ^= k >> R32;
        k = k.wrapping_mul(M32);
        h = h.wrapping_mul(M32);
        h ^= k;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u32) << (8 * i);
        }
        h = h.wrapping_mul(M32);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M32);
    h ^= h >> 15;
    h
}

/// Hash a byte range with the variant matching the target's pointer width.
///
/// Custom key types can build a [`KeyHasher`](crate::KeyHasher) on top of
/// this by hashing a stable byte view of the key.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u64 {
    #[cfg(target_pointer_width = "64")]
    {
        murmur2_64a(data)
    }
    #[cfg(not(target_pointer_width = "64"))]
    {
        murmur2_32(data) as u64
    }
}

//! Pluggable 64-bit hash functions over key bytes.

use xxhash_rust::xxh64::xxh64;

/// Maps a key's byte encoding to a 64-bit hash.
///
/// Must be deterministic: equal byte sequences always hash equally for the
/// lifetime of a map.
pub trait KeyHasher {
    fn hash_bytes(&self, bytes: &[u8]) -> u64;
}

/// XXH64, the default hash function.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct XxHash64 {
    seed: u64,
}

impl XxHash64 {
    pub const fn new() -> Self {
        Self { seed: 0 }
    }

    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl KeyHasher for XxHash64 {
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        xxh64(bytes, self.seed)
    }
}

/// Adapts a plain function or closure into a [`KeyHasher`].
///
/// Handy for deterministic hashing in tests:
///
/// ```
/// use rehash_map::RehashMap;
///
/// let mut m = RehashMap::with_hash_fn(|_: &[u8]| 0u64);
/// m.insert("a", 1);
/// m.insert("b", 2);
/// assert_eq!(m.get("b"), Some(&2));
/// ```
#[derive(Copy, Clone)]
pub struct FnHasher<F>(pub F);

impl<F> KeyHasher for FnHasher<F>
where
    F: Fn(&[u8]) -> u64,
{
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        (self.0)(bytes)
    }
}

impl<F> core::fmt::Debug for FnHasher<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("FnHasher")
    }
}

impl<H: KeyHasher + ?Sized> KeyHasher for &H {
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        (**self).hash_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxhash_is_deterministic_and_seeded() {
        let h = XxHash64::new();
        assert_eq!(h.hash_bytes(b"key"), h.hash_bytes(b"key"));
        assert_ne!(h.hash_bytes(b"key"), h.hash_bytes(b"kez"));
        assert_ne!(
            XxHash64::with_seed(1).hash_bytes(b"key"),
            h.hash_bytes(b"key")
        );
        assert_eq!(h.hash_bytes(b"key"), xxh64(b"key", 0));
    }

    #[test]
    fn fn_hasher_forwards() {
        let h = FnHasher(|b: &[u8]| b.len() as u64);
        assert_eq!(h.hash_bytes(b"abc"), 3);
        assert_eq!((&h).hash_bytes(b""), 0);
    }
}

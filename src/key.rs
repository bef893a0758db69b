//! Canonical byte encodings for keys.
//!
//! The map hashes every key through one byte-oriented hash function. Each key
//! type states how its bytes look; text and byte-string keys expose their
//! contents, fixed-width keys expose their in-memory image.

use bytemuck::Pod;

/// A key that can present itself as a byte sequence for hashing.
///
/// Equal keys must produce equal bytes. When `K: Borrow<Q>`, `K` and `Q` must
/// produce the same bytes for equal values, otherwise borrowed lookups miss.
pub trait KeyBytes {
    /// Call `f` with the canonical byte encoding of `self`.
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R;
}

impl KeyBytes for [u8] {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self)
    }
}

impl KeyBytes for str {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self.as_bytes())
    }
}

impl KeyBytes for String {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self.as_bytes())
    }
}

impl KeyBytes for Box<str> {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self.as_bytes())
    }
}

impl KeyBytes for Vec<u8> {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self)
    }
}

impl KeyBytes for Box<[u8]> {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self)
    }
}

impl<const N: usize> KeyBytes for [u8; N] {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self)
    }
}

impl<T: KeyBytes + ?Sized> KeyBytes for &T {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        (**self).with_key_bytes(f)
    }
}

macro_rules! scalar_key_bytes {
    ($($t:ty),* $(,)?) => {
        $(
            impl KeyBytes for $t {
                #[inline]
                fn with_key_bytes<R, F>(&self, f: F) -> R
                where
                    F: FnOnce(&[u8]) -> R,
                {
                    f(&self.to_ne_bytes())
                }
            }
        )*
    };
}

scalar_key_bytes!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl KeyBytes for bool {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(&[*self as u8])
    }
}

impl KeyBytes for char {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(&u32::from(*self).to_ne_bytes())
    }
}

/// Fixed-layout key hashed over its raw bytes.
///
/// Wrap any `bytemuck::Pod` type (plain structs, arrays of scalars) to use it
/// as a key without writing an encoding by hand.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PodKey<T>(pub T);

impl<T: Pod> KeyBytes for PodKey<T> {
    #[inline]
    fn with_key_bytes<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(bytemuck::bytes_of(&self.0))
    }
}

impl<T> From<T> for PodKey<T> {
    fn from(value: T) -> Self {
        PodKey(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of<K: KeyBytes + ?Sized>(k: &K) -> Vec<u8> {
        k.with_key_bytes(|b| b.to_vec())
    }

    #[test]
    fn owned_and_borrowed_text_agree() {
        let owned = String::from("hello");
        assert_eq!(bytes_of(&owned), bytes_of("hello"));
        assert_eq!(bytes_of(&owned), b"hello".to_vec());
        let boxed: Box<str> = "hello".into();
        assert_eq!(bytes_of(&boxed), bytes_of("hello"));
    }

    #[test]
    fn owned_and_borrowed_bytes_agree() {
        let v = vec![1u8, 2, 3];
        assert_eq!(bytes_of(&v), bytes_of(&v[..]));
        assert_eq!(bytes_of(&[1u8, 2, 3]), bytes_of(&v[..]));
    }

    #[test]
    fn scalars_use_their_full_width() {
        assert_eq!(bytes_of(&7u64).len(), 8);
        assert_eq!(bytes_of(&7i16).len(), 2);
        assert_eq!(bytes_of(&'x').len(), 4);
        assert_eq!(bytes_of(&7u32), 7u32.to_ne_bytes().to_vec());
        assert_ne!(bytes_of(&true), bytes_of(&false));
    }

    #[test]
    fn pod_key_exposes_memory_image() {
        #[repr(C)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
        struct Point {
            x: u32,
            y: u32,
        }

        let k = PodKey(Point { x: 1, y: 2 });
        let mut expected = 1u32.to_ne_bytes().to_vec();
        expected.extend_from_slice(&2u32.to_ne_bytes());
        assert_eq!(bytes_of(&k), expected);
    }
}

//! Iterators over `RehashMap`.

use crate::buckets::{Arena, Entry, EntryKey};
use core::iter::FusedIterator;

/// Iterator over `(&K, &V)` in bucket order.
///
/// Walks generation 0 from the rehash cursor, then generation 1. Every entry
/// is linked into exactly one chain of one generation, so each is yielded
/// exactly once wherever the migration stands.
pub struct Iter<'a, K, V> {
    arena: &'a Arena<K, V>,
    generations: [&'a [Option<EntryKey>]; 2],
    generation: usize,
    bucket: usize,
    chain: Option<EntryKey>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(arena: &'a Arena<K, V>, generations: [&'a [Option<EntryKey>]; 2]) -> Self {
        Self {
            arena,
            generations,
            generation: 0,
            bucket: 0,
            chain: None,
            remaining: arena.len(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.chain {
                let arena = self.arena;
                let e = &arena[k];
                self.chain = e.next;
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            let heads = *self.generations.get(self.generation)?;
            match heads.get(self.bucket) {
                Some(&head) => {
                    self.chain = head;
                    self.bucket += 1;
                }
                None => {
                    self.generation += 1;
                    self.bucket = 0;
                }
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            generations: self.generations,
            generation: self.generation,
            bucket: self.bucket,
            chain: self.chain,
            remaining: self.remaining,
        }
    }
}

/// Iterator over `(&K, &mut V)` in arena order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, EntryKey, Entry<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(arena: &'a mut Arena<K, V>) -> Self {
        Self {
            it: arena.iter_mut(),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &mut e.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over `(K, V)` in arena order.
pub struct IntoIter<K, V> {
    it: slotmap::basic::IntoIter<EntryKey, Entry<K, V>>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(arena: Arena<K, V>) -> Self {
        Self {
            it: arena.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (e.key, e.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

/// Keys in bucket order. See [`Iter`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Values in bucket order. See [`Iter`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Mutable values in arena order.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(inner: IterMut<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use crate::RehashMap;
    use std::collections::BTreeMap;

    #[test]
    fn empty_map_yields_nothing() {
        let m: RehashMap<u32, u32> = RehashMap::new();
        assert_eq!(m.iter().next(), None);
        assert_eq!(m.iter().len(), 0);
    }

    /// Invariant: every entry is yielded once at each point of a migration,
    /// and the reported length stays exact.
    #[test]
    fn exactly_once_throughout_migration() {
        let mut m = RehashMap::new();
        for i in 0u32..100 {
            m.insert(i, i * 2);
        }
        m.request_resize(512).unwrap();
        loop {
            let it = m.iter();
            assert_eq!(it.len(), 100);
            let seen: BTreeMap<u32, u32> = it.map(|(k, v)| (*k, *v)).collect();
            assert_eq!(seen.len(), 100);
            assert!(seen.iter().all(|(k, v)| *v == k * 2));
            if !m.rehash_step(1) {
                break;
            }
        }
    }

    #[test]
    fn values_mut_updates_in_place() {
        let mut m = RehashMap::new();
        for i in 0u32..10 {
            m.insert(i, i);
        }
        m.request_resize(64).unwrap();
        m.rehash_step(1);
        for v in m.values_mut() {
            *v += 100;
        }
        for (k, v) in &mut m {
            *v += *k;
        }
        m.finish_rehash();
        for i in 0u32..10 {
            assert_eq!(m.peek(&i), Some(&(100 + 2 * i)));
        }
    }

    #[test]
    fn into_iter_returns_owned_pairs() {
        let mut m = RehashMap::new();
        m.insert("a".to_string(), 1);
        m.insert("b".to_string(), 2);
        let mut pairs: Vec<(String, i32)> = m.into_iter().collect();
        pairs.sort();
        assert_eq!(pairs, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }
}

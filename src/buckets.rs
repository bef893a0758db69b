//! Bucket storage: one generation of chained buckets over a shared entry arena.
//!
//! Entries live in a `SlotMap`; a chain is a singly linked list threaded
//! through the arena by `Entry::next`. A bucket head is the arena key of the
//! first entry in its chain. Moving an entry between generations relinks its
//! key and never touches the entry's storage.

use core::borrow::Borrow;
use slotmap::{DefaultKey, SlotMap};

pub(crate) type EntryKey = DefaultKey;
pub(crate) type Arena<K, V> = SlotMap<EntryKey, Entry<K, V>>;

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// Computed once on insert; bucket indices in every generation derive from it.
    pub(crate) hash: u64,
    pub(crate) next: Option<EntryKey>,
}

/// One generation: `2^exp` bucket heads and the number of entries chained
/// from them.
#[derive(Clone, Debug)]
pub(crate) struct Buckets {
    heads: Box<[Option<EntryKey>]>,
    pub(crate) used: usize,
    exp: u8,
}

impl Buckets {
    pub(crate) fn with_exp(exp: u8) -> Self {
        Self {
            heads: vec![None; 1usize << exp].into_boxed_slice(),
            used: 0,
            exp,
        }
    }

    /// Like [`with_exp`](Self::with_exp), but `None` when the allocator
    /// cannot provide the head array.
    pub(crate) fn try_with_exp(exp: u8) -> Option<Self> {
        let len = 1usize.checked_shl(u32::from(exp))?;
        let mut heads = Vec::new();
        heads.try_reserve_exact(len).ok()?;
        heads.resize(len, None);
        Some(Self {
            heads: heads.into_boxed_slice(),
            used: 0,
            exp,
        })
    }

    #[inline]
    pub(crate) fn exp(&self) -> u8 {
        self.exp
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.heads.len()
    }

    #[inline]
    pub(crate) fn index(&self, hash: u64) -> usize {
        (hash & (self.heads.len() as u64 - 1)) as usize
    }

    #[inline]
    pub(crate) fn heads(&self) -> &[Option<EntryKey>] {
        &self.heads
    }

    #[inline]
    pub(crate) fn is_bucket_empty(&self, index: usize) -> bool {
        self.heads[index].is_none()
    }

    /// Scan the chain `hash` maps to for an entry whose key equals `q`.
    pub(crate) fn find<K, V, Q>(&self, arena: &Arena<K, V>, hash: u64, q: &Q) -> Option<EntryKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self.heads[self.index(hash)];
        while let Some(k) = cur {
            let e = &arena[k];
            if e.hash == hash && e.key.borrow() == q {
                return Some(k);
            }
            cur = e.next;
        }
        None
    }

    /// Prepend an arena entry to the chain its stored hash maps to.
    pub(crate) fn push_front<K, V>(&mut self, arena: &mut Arena<K, V>, k: EntryKey) {
        let e = &mut arena[k];
        let i = self.index(e.hash);
        e.next = self.heads[i];
        self.heads[i] = Some(k);
        self.used += 1;
    }

    /// Unlink the entry whose key equals `q` and return its arena key. The
    /// entry itself stays in the arena for the caller to remove.
    pub(crate) fn unlink<K, V, Q>(
        &mut self,
        arena: &mut Arena<K, V>,
        hash: u64,
        q: &Q,
    ) -> Option<EntryKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let i = self.index(hash);
        let mut prev: Option<EntryKey> = None;
        let mut cur = self.heads[i];
        while let Some(k) = cur {
            let e = &arena[k];
            let next = e.next;
            if e.hash == hash && e.key.borrow() == q {
                match prev {
                    None => self.heads[i] = next,
                    Some(p) => arena[p].next = next,
                }
                self.used -= 1;
                return Some(k);
            }
            prev = cur;
            cur = next;
        }
        None
    }

    /// Detach a whole chain, leaving the bucket empty. `used` is left to the
    /// caller, which accounts for each entry as it is moved.
    #[inline]
    pub(crate) fn take_chain(&mut self, index: usize) -> Option<EntryKey> {
        self.heads[index].take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(arena: &mut Arena<&'static str, i32>, key: &'static str, hash: u64) -> EntryKey {
        arena.insert(Entry {
            key,
            value: 0,
            hash,
            next: None,
        })
    }

    fn chain_keys(b: &Buckets, arena: &Arena<&'static str, i32>, index: usize) -> Vec<&'static str> {
        let mut out = Vec::new();
        let mut cur = b.heads()[index];
        while let Some(k) = cur {
            out.push(arena[k].key);
            cur = arena[k].next;
        }
        out
    }

    #[test]
    fn fallible_allocation() {
        let b = Buckets::try_with_exp(3).unwrap();
        assert_eq!(b.capacity(), 8);
        assert!(b.heads().iter().all(Option::is_none));
        assert!(Buckets::try_with_exp(64).is_none());
    }

    #[test]
    fn index_is_masked_hash() {
        let b = Buckets::with_exp(3);
        assert_eq!(b.capacity(), 8);
        assert_eq!(b.index(0), 0);
        assert_eq!(b.index(13), 5);
        assert_eq!(b.index(u64::MAX), 7);
    }

    #[test]
    fn push_front_prepends_and_counts() {
        let mut arena = Arena::with_key();
        let mut b = Buckets::with_exp(2);
        for key in ["a", "b", "c"] {
            let k = entry(&mut arena, key, 1);
            b.push_front(&mut arena, k);
        }
        assert_eq!(b.used, 3);
        assert_eq!(chain_keys(&b, &arena, 1), vec!["c", "b", "a"]);
        assert!(b.find(&arena, 1, &"b").is_some());
        assert!(b.find(&arena, 1, &"z").is_none());
        // Same key under a different hash lands elsewhere and is not found.
        assert!(b.find(&arena, 2, &"b").is_none());
    }

    /// Unlinking from the middle and tail keeps the rest of the chain intact.
    #[test]
    fn unlink_non_head_preserves_chain() {
        let mut arena = Arena::with_key();
        let mut b = Buckets::with_exp(2);
        for key in ["a", "b", "c", "d"] {
            let k = entry(&mut arena, key, 3);
            b.push_front(&mut arena, k);
        }
        // Chain is d -> c -> b -> a.
        let k = b.unlink(&mut arena, 3, &"b").expect("b present");
        arena.remove(k);
        assert_eq!(chain_keys(&b, &arena, 3), vec!["d", "c", "a"]);

        let k = b.unlink(&mut arena, 3, &"a").expect("a present");
        arena.remove(k);
        assert_eq!(chain_keys(&b, &arena, 3), vec!["d", "c"]);

        let k = b.unlink(&mut arena, 3, &"d").expect("d present");
        arena.remove(k);
        assert_eq!(chain_keys(&b, &arena, 3), vec!["c"]);

        assert!(b.unlink(&mut arena, 3, &"zz").is_none());
        assert_eq!(b.used, 1);
    }

    #[test]
    fn take_chain_empties_bucket() {
        let mut arena = Arena::with_key();
        let mut b = Buckets::with_exp(2);
        let k = entry(&mut arena, "a", 0);
        b.push_front(&mut arena, k);
        assert!(!b.is_bucket_empty(0));
        assert_eq!(b.take_chain(0), Some(k));
        assert!(b.is_bucket_empty(0));
        // Accounting is the caller's job.
        assert_eq!(b.used, 1);
    }
}

//! RehashMap: the public table, its lookup paths and resize requests.

use crate::buckets::{Arena, Buckets, Entry, EntryKey};
use crate::config::{Config, RehashMapBuilder, MIN_CAPACITY, MIN_EXP};
use crate::error::ResizeError;
use crate::hasher::{FnHasher, KeyHasher, XxHash64};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::key::KeyBytes;
use core::borrow::Borrow;
use core::fmt;
use core::mem;
use tracing::{debug, trace};

/// Which bucket arrays are live.
#[derive(Clone, Debug)]
pub(crate) enum State {
    /// Nothing allocated yet.
    Unallocated,
    Stable(Buckets),
    /// Entries are moving from `old` to `new`. Every bucket of `old` below
    /// `cursor` is empty.
    Rehashing {
        old: Buckets,
        new: Buckets,
        cursor: usize,
    },
}

/// A chained hash map that resizes incrementally.
///
/// A resize allocates the new bucket array and returns; the entries move over
/// a few buckets at a time during later `get`/`insert`/`remove` calls (or
/// explicit [`rehash_step`](Self::rehash_step) calls), so no single call pays
/// for the whole table.
///
/// ```
/// use rehash_map::RehashMap;
///
/// let mut m = RehashMap::new();
/// for (k, v) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
///     m.insert(k, v);
/// }
/// m.request_resize(16).unwrap();
/// while m.rehash_step(1) {
///     assert_eq!(m.peek("c"), Some(&3));
/// }
/// assert_eq!(m.capacity(), 16);
/// ```
#[derive(Clone)]
pub struct RehashMap<K, V, H = XxHash64> {
    pub(crate) hasher: H,
    pub(crate) arena: Arena<K, V>,
    pub(crate) state: State,
    pub(crate) config: Config,
}

/// Snapshot of the two generations, for monitoring and tests.
///
/// Index 0 is the generation being drained (or the only one), index 1 the
/// generation being filled. An inactive generation reports zero for both.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MapStats {
    pub used: [usize; 2],
    pub capacity: [usize; 2],
    /// Next bucket of generation 0 to migrate; `None` when not rehashing.
    pub rehash_cursor: Option<usize>,
}

impl<K, V> RehashMap<K, V> {
    /// Create an empty map. Nothing is allocated until the first insert.
    pub fn new() -> Self {
        Self::from_parts(XxHash64::new(), Config::default())
    }

    /// Create a map whose buckets can hold `capacity` entries at load factor 1.
    pub fn with_capacity(capacity: usize) -> Self {
        RehashMapBuilder::new().capacity(capacity).build()
    }
}

impl RehashMap<(), ()> {
    /// Start configuring a map. See [`RehashMapBuilder`].
    pub fn builder() -> RehashMapBuilder {
        RehashMapBuilder::new()
    }
}

impl<K, V> Default for RehashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, F> RehashMap<K, V, FnHasher<F>>
where
    F: Fn(&[u8]) -> u64,
{
    /// Create an empty map hashing keys with `f`.
    pub fn with_hash_fn(f: F) -> Self {
        Self::from_parts(FnHasher(f), Config::default())
    }
}

impl<K, V, H> RehashMap<K, V, H> {
    pub(crate) fn from_parts(hasher: H, config: Config) -> Self {
        Self {
            hasher,
            arena: Arena::with_key(),
            state: State::Unallocated,
            config,
        }
    }

    /// Create an empty map hashing keys with `hasher`.
    pub fn with_hasher(hasher: H) -> Self {
        Self::from_parts(hasher, Config::default())
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Bucket count of generation 0: the current table when stable, the table
    /// being drained while rehashing, 0 before the first allocation.
    pub fn capacity(&self) -> usize {
        match &self.state {
            State::Unallocated => 0,
            State::Stable(b) => b.capacity(),
            State::Rehashing { old, .. } => old.capacity(),
        }
    }

    pub fn is_rehashing(&self) -> bool {
        matches!(self.state, State::Rehashing { .. })
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn stats(&self) -> MapStats {
        match &self.state {
            State::Unallocated => MapStats::default(),
            State::Stable(b) => MapStats {
                used: [b.used, 0],
                capacity: [b.capacity(), 0],
                rehash_cursor: None,
            },
            State::Rehashing { old, new, cursor } => MapStats {
                used: [old.used, new.used],
                capacity: [old.capacity(), new.capacity()],
                rehash_cursor: Some(*cursor),
            },
        }
    }

    /// Drop every entry and release the bucket arrays. Cancels any migration.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.state = State::Unallocated;
    }

    /// Visit every entry once: generation 0 from the rehash cursor onward,
    /// then generation 1, each in bucket order and chain order.
    ///
    /// Does no migration work. Use [`iter`](Self::iter) to stop early.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            visit(k, v);
        }
    }

    /// Iterate in the same order as [`range`](Self::range).
    pub fn iter(&self) -> Iter<'_, K, V> {
        let empty: &[Option<EntryKey>] = &[];
        let generations = match &self.state {
            State::Unallocated => [empty, empty],
            State::Stable(b) => [b.heads(), empty],
            State::Rehashing { old, new, cursor } => [&old.heads()[*cursor..], new.heads()],
        };
        Iter::new(&self.arena, generations)
    }

    /// Iterate with mutable values. Order is unspecified.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.arena)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Mutable values. Order is unspecified.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Ask for a table that holds `target` entries at load factor 1.
    ///
    /// The new capacity is the smallest power of two `>= target`, and never
    /// below 4. The first sizing installs the table directly; later ones arm a
    /// migration that runs during subsequent operations. Asking for the
    /// current capacity does nothing.
    pub fn request_resize(&mut self, target: usize) -> Result<(), ResizeError> {
        if self.is_rehashing() {
            return Err(ResizeError::AlreadyRehashing);
        }
        let len = self.len();
        if target < len {
            return Err(ResizeError::SizeTooSmall {
                requested: target,
                len,
            });
        }
        let exp = exp_for(target).ok_or(ResizeError::CapacityOverflow { requested: target })?;

        let new = match &self.state {
            State::Stable(b) if b.exp() == exp => return Ok(()),
            _ => Buckets::try_with_exp(exp)
                .ok_or(ResizeError::CapacityOverflow { requested: target })?,
        };
        self.state = match mem::replace(&mut self.state, State::Unallocated) {
            State::Stable(old) => {
                debug!(
                    old_capacity = old.capacity(),
                    new_capacity = new.capacity(),
                    len,
                    "rehash armed"
                );
                State::Rehashing {
                    old,
                    new,
                    cursor: 0,
                }
            }
            // Unallocated: first sizing needs no migration. Rehashing was
            // rejected above.
            _ => {
                debug!(capacity = new.capacity(), "allocated initial buckets");
                State::Stable(new)
            }
        };
        Ok(())
    }

    /// Resize to the smallest capacity that holds the current entries.
    ///
    /// A map that has never allocated stays unallocated.
    pub fn shrink_to_fit(&mut self) -> Result<(), ResizeError> {
        match self.state {
            State::Rehashing { .. } => Err(ResizeError::AlreadyRehashing),
            State::Unallocated => Ok(()),
            State::Stable(_) => self.request_resize(self.len().max(MIN_CAPACITY)),
        }
    }
}

impl<K, V, H> RehashMap<K, V, H>
where
    K: KeyBytes + Eq,
    H: KeyHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + KeyBytes,
    {
        q.with_key_bytes(|bytes| self.hasher.hash_bytes(bytes))
    }

    /// Migration work charged to every ordinary operation.
    #[inline]
    fn step(&mut self) {
        self.rehash_step(self.config.step_buckets);
    }

    /// Find an entry without migrating anything. While rehashing, generation
    /// 0 is only probed when its bucket has not been migrated yet.
    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<EntryKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        match &self.state {
            State::Unallocated => None,
            State::Stable(b) => b.find(&self.arena, hash, q),
            State::Rehashing { old, new, cursor } => {
                if old.index(hash) >= *cursor {
                    if let Some(k) = old.find(&self.arena, hash, q) {
                        return Some(k);
                    }
                }
                new.find(&self.arena, hash, q)
            }
        }
    }

    /// Look a key up, paying this call's share of any running migration.
    pub fn get<Q>(&mut self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
    {
        self.step();
        let hash = self.make_hash(q);
        let k = self.locate(hash, q)?;
        self.arena.get(k).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
    {
        self.step();
        let hash = self.make_hash(q);
        let k = self.locate(hash, q)?;
        self.arena.get_mut(k).map(|e| &mut e.value)
    }

    /// The value for `q`, or `V::default()` when absent.
    pub fn get_or_default<Q>(&mut self, q: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
        V: Clone + Default,
    {
        self.get(q).cloned().unwrap_or_default()
    }

    /// Look a key up without doing any migration work.
    pub fn peek<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
    {
        let hash = self.make_hash(q);
        let k = self.locate(hash, q)?;
        self.arena.get(k).map(|e| &e.value)
    }

    pub fn contains_key<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
    {
        self.step();
        let hash = self.make_hash(q);
        self.locate(hash, q).is_some()
    }

    /// Insert `key -> value`. An existing key keeps its entry and chain
    /// position; its old value is returned.
    ///
    /// New entries go to generation 1 while rehashing so they never need to
    /// migrate.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.step();
        let hash = self.make_hash(&key);
        if let Some(k) = self.locate(hash, &key) {
            return Some(mem::replace(&mut self.arena[k].value, value));
        }

        let k = self.arena.insert(Entry {
            key,
            value,
            hash,
            next: None,
        });
        match &mut self.state {
            State::Unallocated => {
                let mut b = Buckets::with_exp(MIN_EXP);
                b.push_front(&mut self.arena, k);
                debug!(capacity = b.capacity(), "allocated initial buckets");
                self.state = State::Stable(b);
            }
            State::Stable(b) => b.push_front(&mut self.arena, k),
            State::Rehashing { new, .. } => new.push_front(&mut self.arena, k),
        }

        self.maybe_grow();
        None
    }

    /// Remove `q`, returning its value. Removing an absent key does nothing.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyBytes + Eq,
    {
        self.step();
        let hash = self.make_hash(q);
        let k = match &mut self.state {
            State::Unallocated => None,
            State::Stable(b) => b.unlink(&mut self.arena, hash, q),
            State::Rehashing { old, new, cursor } => {
                let from_old = if old.index(hash) >= *cursor {
                    old.unlink(&mut self.arena, hash, q)
                } else {
                    None
                };
                match from_old {
                    Some(k) => Some(k),
                    None => new.unlink(&mut self.arena, hash, q),
                }
            }
        }?;

        let entry = self.arena.remove(k)?;
        self.maybe_shrink();
        Some((entry.key, entry.value))
    }

    fn maybe_grow(&mut self) {
        if let State::Stable(b) = &self.state {
            if self.config.policy.wants_grow(b.used, b.capacity()) {
                let target = b.used.saturating_mul(2);
                if let Err(e) = self.request_resize(target) {
                    trace!(%e, target, "automatic grow skipped");
                }
            }
        }
    }

    fn maybe_shrink(&mut self) {
        if let State::Stable(b) = &self.state {
            if self.config.policy.wants_shrink(b.used, b.capacity()) {
                if let Err(e) = self.shrink_to_fit() {
                    trace!(%e, "automatic shrink skipped");
                }
            }
        }
    }
}

/// Smallest exponent whose capacity covers `target`, floored at [`MIN_EXP`].
/// `None` when the head array would exceed `isize::MAX` bytes.
fn exp_for(target: usize) -> Option<u8> {
    let capacity = target.max(MIN_CAPACITY).checked_next_power_of_two()?;
    if capacity > isize::MAX as usize / mem::size_of::<Option<EntryKey>>() {
        return None;
    }
    Some(capacity.trailing_zeros() as u8)
}

impl<K, V, H> fmt::Debug for RehashMap<K, V, H>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, H> Extend<(K, V)> for RehashMap<K, V, H>
where
    K: KeyBytes + Eq,
    H: KeyHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RehashMap<K, V>
where
    K: KeyBytes + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut m = RehashMap::with_capacity(iter.size_hint().0);
        m.extend(iter);
        m
    }
}

impl<'a, K, V, H> IntoIterator for &'a RehashMap<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, H> IntoIterator for &'a mut RehashMap<K, V, H> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, H> IntoIterator for RehashMap<K, V, H> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.arena)
    }
}

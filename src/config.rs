//! Tunables and the builder used to construct a [`RehashMap`].

use crate::hasher::{FnHasher, KeyHasher, XxHash64};
use crate::rehash_map::RehashMap;
use core::fmt;
use tracing::debug;

/// Smallest size exponent a generation ever uses (capacity 4).
pub(crate) const MIN_EXP: u8 = 2;
/// Smallest capacity a generation ever uses.
pub(crate) const MIN_CAPACITY: usize = 1 << MIN_EXP;

const DEFAULT_STEP_BUCKETS: usize = 1;
const DEFAULT_EMPTY_VISIT_FACTOR: usize = 10;

/// When, if ever, the map starts a resize on its own.
///
/// Either way the migration itself is incremental; the policy only decides
/// when one gets armed.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ResizePolicy {
    /// Only explicit `request_resize`/`shrink_to_fit` calls resize the map.
    /// The first insert still allocates the minimum capacity.
    #[default]
    Manual,

    /// Grow to twice the entry count once `len >= capacity * grow_at`, shrink
    /// to fit once `len < capacity * shrink_below`. Checked after inserts and
    /// removals respectively, and only while no migration is running.
    Automatic { grow_at: f64, shrink_below: f64 },
}

impl ResizePolicy {
    /// Automatic resizing at load factor 1.0, shrinking below 0.1.
    pub const fn automatic() -> Self {
        ResizePolicy::Automatic {
            grow_at: 1.0,
            shrink_below: 0.1,
        }
    }

    pub(crate) fn wants_grow(&self, len: usize, capacity: usize) -> bool {
        match *self {
            ResizePolicy::Manual => false,
            ResizePolicy::Automatic { grow_at, .. } => len as f64 >= capacity as f64 * grow_at,
        }
    }

    pub(crate) fn wants_shrink(&self, len: usize, capacity: usize) -> bool {
        match *self {
            ResizePolicy::Manual => false,
            ResizePolicy::Automatic { shrink_below, .. } => {
                capacity > MIN_CAPACITY && (len as f64) < capacity as f64 * shrink_below
            }
        }
    }
}

/// Per-map tunables, fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Config {
    /// Buckets migrated by each `get`/`insert`/`remove`.
    pub(crate) step_buckets: usize,
    /// Empty buckets a step may skip, per bucket of budget.
    pub(crate) empty_visit_factor: usize,
    pub(crate) policy: ResizePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_buckets: DEFAULT_STEP_BUCKETS,
            empty_visit_factor: DEFAULT_EMPTY_VISIT_FACTOR,
            policy: ResizePolicy::Manual,
        }
    }
}

/// A builder for a [`RehashMap`].
///
/// ```
/// use rehash_map::{RehashMap, ResizePolicy, XxHash64};
///
/// let mut m: RehashMap<String, u32> = RehashMap::builder()
///     // Allocate room for 1000 entries up front.
///     .capacity(1000)
///     // Seed the default hash function.
///     .hasher(XxHash64::with_seed(7))
///     // Migrate four buckets per operation instead of one.
///     .step_buckets(4)
///     // Let the map decide when to grow and shrink.
///     .resize_policy(ResizePolicy::automatic())
///     .build();
/// m.insert("k".to_string(), 1);
/// assert!(m.capacity() >= 1000);
/// ```
pub struct RehashMapBuilder<H = XxHash64> {
    hasher: H,
    capacity: usize,
    config: Config,
}

impl RehashMapBuilder {
    pub(crate) fn new() -> Self {
        Self {
            hasher: XxHash64::new(),
            capacity: 0,
            config: Config::default(),
        }
    }
}

impl<H> RehashMapBuilder<H> {
    /// Set the hash function used for keys.
    pub fn hasher<H2: KeyHasher>(self, hasher: H2) -> RehashMapBuilder<H2> {
        RehashMapBuilder {
            hasher,
            capacity: self.capacity,
            config: self.config,
        }
    }

    /// Set the hash function from a plain function or closure.
    pub fn hash_fn<F>(self, f: F) -> RehashMapBuilder<FnHasher<F>>
    where
        F: Fn(&[u8]) -> u64,
    {
        self.hasher(FnHasher(f))
    }

    /// Set the initial capacity. The map is allocated with the smallest power
    /// of two that holds `capacity` entries; 0 leaves it unallocated.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Set how many buckets each ordinary operation migrates. Clamped to 1.
    pub fn step_buckets(mut self, buckets: usize) -> Self {
        self.config.step_buckets = buckets.max(1);
        self
    }

    /// Set how many empty buckets a step may skip per bucket of budget.
    /// Clamped to 1.
    pub fn empty_visit_factor(mut self, factor: usize) -> Self {
        self.config.empty_visit_factor = factor.max(1);
        self
    }

    /// Set the resize policy. See [`ResizePolicy`].
    pub fn resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Construct a [`RehashMap`] from the builder.
    ///
    /// A capacity whose bucket array cannot be allocated leaves the map
    /// unallocated; it sizes itself on first insert as usual.
    pub fn build<K, V>(self) -> RehashMap<K, V, H>
    where
        H: KeyHasher,
    {
        let mut map = RehashMap::from_parts(self.hasher, self.config);
        if self.capacity > 0 {
            // A fresh map is neither rehashing nor holding entries, so only
            // overflow can fail here.
            if let Err(e) = map.request_resize(self.capacity) {
                debug!(%e, capacity = self.capacity, "initial capacity not allocated");
            }
        }
        map
    }
}

impl<H> fmt::Debug for RehashMapBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RehashMapBuilder")
            .field("capacity", &self.capacity)
            .field("step_buckets", &self.config.step_buckets)
            .field("empty_visit_factor", &self.config.empty_visit_factor)
            .field("resize_policy", &self.config.policy)
            .finish()
    }
}

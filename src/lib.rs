//! rehash-map: a single-threaded, separately chained hash map that resizes
//! incrementally, so no single operation pays for a whole-table rehash.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: bound the worst-case cost of any one call while the table grows
//!   or shrinks, the way in-memory key/value engines keep tail latency flat.
//! - Layers:
//!   - `Buckets`: one generation of `2^e` chained buckets plus its live
//!     count. Index = `hash & (2^e - 1)`.
//!   - Entry arena: every entry lives in one `SlotMap` shared by both
//!     generations; chains link entries by arena key.
//!   - `RehashMap<K, V, H>`: a state machine over
//!     `Unallocated | Stable(gen) | Rehashing { old, new, cursor }`, plus the
//!     public operations.
//!   - Stepper (`rehash_step`): moves whole chains from `old` to `new` in
//!     cursor order under a bucket budget and an empty-visit budget, then
//!     promotes `new` once `old` is empty.
//!
//! Constraints
//! - Single-threaded: no atomics, no interior mutability. Share it behind
//!   your own lock.
//! - Capacities are powers of two, never below 4.
//! - A resize request only allocates; migration happens during later
//!   `get`/`insert`/`remove` calls (one bucket each by default) or explicit
//!   `rehash_step` calls.
//! - Every call does bounded work: at most `step_buckets` chains moved and at
//!   most `step_buckets * empty_visit_factor` empty buckets skipped.
//!
//! Invariants
//! - `len() == used[0] + used[1] == arena.len()`, across every step.
//! - While rehashing, every bucket of `old` below `cursor` is empty. Lookups
//!   probe `old` only for buckets at or past the cursor, then `new`.
//! - New keys go to `new` while rehashing, so nothing inserted mid-migration
//!   ever needs to move.
//! - Overwrites keep the entry (and its chain position) and swap the value.
//!
//! Hashing
//! - Keys implement [`KeyBytes`], exposing a canonical byte encoding; text
//!   and byte strings expose their contents, scalars their native-endian
//!   image, and [`PodKey`] any `bytemuck::Pod` struct.
//! - A [`KeyHasher`] maps those bytes to a `u64`; [`XxHash64`] by default,
//!   [`FnHasher`] for any function (deterministic hashing in tests).
//! - The hash is stored in the entry on insert. Migration and automatic
//!   resizing never re-encode or re-hash a key.
//!
//! Notes and non-goals
//! - No concurrent access, no persistence.
//! - No automatic resizing unless [`ResizePolicy::Automatic`] is chosen; the
//!   default `Manual` policy leaves the decision to the caller.
//! - `get` takes `&mut self` because it performs migration work; `peek`
//!   reads without it.

mod buckets;
pub mod config;
mod error;
pub mod hasher;
pub mod iter;
pub mod key;
mod rehash;
mod rehash_map;
mod rehash_map_proptest;

// Public surface
pub use config::{RehashMapBuilder, ResizePolicy};
pub use error::ResizeError;
pub use hasher::{FnHasher, KeyHasher, XxHash64};
pub use key::{KeyBytes, PodKey};
pub use rehash_map::{MapStats, RehashMap};

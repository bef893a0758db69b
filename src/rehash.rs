//! The incremental migration engine.
//!
//! A migration drains generation 0 bucket by bucket, in index order, into
//! generation 1. Each call does bounded work: at most `buckets` non-empty
//! buckets, and at most `buckets * empty_visit_factor` empty ones skipped.
//! When generation 0 holds no more entries, generation 1 takes its place. The
//! count decides completion, not the cursor, so trailing empty buckets are
//! never visited.

use crate::rehash_map::{RehashMap, State};
use core::mem;
use tracing::{debug, trace};

impl<K, V, H> RehashMap<K, V, H> {
    /// Migrate up to `buckets` non-empty buckets. Returns whether the map is
    /// still rehashing afterwards; `false` straight away when it wasn't.
    ///
    /// Ordinary operations already call this with a budget of one bucket (see
    /// [`RehashMapBuilder::step_buckets`](crate::RehashMapBuilder::step_buckets));
    /// call it directly to finish a migration during idle time.
    pub fn rehash_step(&mut self, buckets: usize) -> bool {
        let State::Rehashing { old, new, cursor } = &mut self.state else {
            return false;
        };

        let start = *cursor;
        let mut budget = buckets;
        let mut empty_visits = buckets.saturating_mul(self.config.empty_visit_factor);
        let mut moved = 0usize;

        'work: while budget > 0 && old.used > 0 {
            // Some bucket at or past the cursor still holds an entry.
            while old.is_bucket_empty(*cursor) {
                *cursor += 1;
                empty_visits -= 1;
                if empty_visits == 0 {
                    break 'work;
                }
            }

            let mut link = old.take_chain(*cursor);
            while let Some(k) = link {
                link = self.arena[k].next;
                new.push_front(&mut self.arena, k);
                old.used -= 1;
                moved += 1;
            }
            *cursor += 1;
            budget -= 1;
        }

        if moved > 0 {
            trace!(
                from = start,
                to = *cursor,
                moved,
                remaining = old.used,
                "rehash step"
            );
        }
        if old.used > 0 {
            return true;
        }

        if let State::Rehashing { new, .. } = mem::replace(&mut self.state, State::Unallocated) {
            debug!(
                capacity = new.capacity(),
                len = new.used,
                "rehash complete"
            );
            self.state = State::Stable(new);
        }
        false
    }

    /// Run the current migration, if any, to completion.
    pub fn finish_rehash(&mut self) {
        while self.rehash_step(self.capacity().max(1)) {}
    }
}

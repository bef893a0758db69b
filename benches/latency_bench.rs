//! Worst single-insert latency while the table grows from empty.
//!
//! Incremental migration spreads each resize over later operations; the
//! "blocking" run finishes every migration inside the insert that armed it,
//! which is what a conventional rehash costs.
use rehash_map::{RehashMap, ResizePolicy};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const ITEMS: u64 = 5_000_000;

fn main() {
    println!("=== rehash-map (incremental) ===");
    let mut m = RehashMap::builder()
        .resize_policy(ResizePolicy::automatic())
        .build();
    max_insert(|i| {
        m.insert(i, ());
    });

    println!("=== rehash-map (blocking) ===");
    let mut m = RehashMap::builder()
        .resize_policy(ResizePolicy::automatic())
        .build();
    max_insert(|i| {
        m.insert(i, ());
        m.finish_rehash();
    });

    println!("=== std ===");
    let mut m = HashMap::new();
    max_insert(|i| {
        m.insert(i, ());
    });
}

fn max_insert(mut insert: impl FnMut(u64)) {
    let mut max = Duration::ZERO;
    let start = Instant::now();

    for i in 0..ITEMS {
        let now = Instant::now();
        insert(i);
        max = max.max(now.elapsed());
    }

    println!(
        "max insert: {}us, total: {}ms",
        max.as_micros(),
        start.elapsed().as_millis()
    );
}

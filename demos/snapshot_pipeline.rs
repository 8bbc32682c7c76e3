//! Three producers feed a pooled swap queue while the main thread takes
//! snapshots; epoch sizes are summarized at the end. Run with
//! `cargo run --example snapshot_pipeline`.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use flipring::sync::{BufferPool, MpscSwapQueue};
use flipring::util::stats::Summary;

const PRODUCERS: usize = 3;
const PER_PRODUCER: usize = 2_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pool = Arc::new(BufferPool::new());
    let queue = Arc::new(MpscSwapQueue::with_pool(256, Arc::clone(&pool)).unwrap());

    let mut handles = Vec::new();
    for id in 0..PRODUCERS {
        let queue = Arc::clone(&queue);
        handles.push(thread::spawn(move || {
            for i in 0..PER_PRODUCER {
                let value = ((id as u64) << 32) | i as u64;
                while !queue.try_push(value) {
                    thread::yield_now();
                }
            }
        }));
    }

    let mut seen: HashSet<u64> = HashSet::new();
    let mut epoch_sizes = Vec::new();
    while seen.len() < PRODUCERS * PER_PRODUCER {
        let snap = queue.snapshot().unwrap();
        epoch_sizes.push(snap.len() as f64);
        for &item in snap.iter() {
            assert!(seen.insert(item), "item observed twice");
        }
    }

    for h in handles {
        h.join().unwrap();
    }

    let summary = Summary::from_slice(&epoch_sizes).unwrap();
    println!(
        "drained {} items over {} snapshots (epoch size mean {:.1}, max {:.0})",
        seen.len(),
        summary.count,
        summary.mean,
        summary.max
    );

    drop(queue);
    println!("pool holds {} idle buffers after shutdown", pool.idle());
}

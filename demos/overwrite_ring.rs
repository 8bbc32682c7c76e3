//! Two writer threads race into a small overwrite ring; the main thread
//! drains whatever survived. Run with `cargo run --example overwrite_ring`.

use std::sync::Arc;
use std::thread;

use flipring::sync::RingOverwriteBuffer;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ring = Arc::new(RingOverwriteBuffer::new(8).unwrap());
    println!("ring capacity: {}", ring.capacity());

    let mut handles = Vec::new();
    for id in 0..2u64 {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for seq in 0..100 {
                ring.write(id * 1_000 + seq);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    println!("{} unread entries survived 200 writes", ring.len());
    while let Some(v) = ring.try_read() {
        println!("  writer {} seq {}", v / 1_000, v % 1_000);
    }
}

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use flowbuf::{BoundedQueue, LockedQueue, RingQueue};

fn main() {
    divan::main();
}

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

const CAPACITY: usize = 32_768;
const BURST: usize = 100;

fn locked() -> Arc<dyn BoundedQueue<u64>> {
    Arc::new(LockedQueue::with_capacity(CAPACITY))
}

fn ring() -> Arc<dyn BoundedQueue<u64>> {
    Arc::new(RingQueue::new(CAPACITY).unwrap())
}

#[divan::bench(args = ["locked", "ring"])]
fn bench_burst_round_trip(bencher: divan::Bencher, kind: &str) {
    let queue = if kind == "ring" { ring() } else { locked() };
    bencher.bench_local(move || {
        for i in 0..BURST as u64 {
            queue.try_push(black_box(i)).unwrap();
        }
        for _ in 0..BURST {
            black_box(queue.try_pop().unwrap());
        }
    });
}

#[divan::bench(args = ["locked", "ring"], sample_count = 20)]
fn bench_spsc_transfer(bencher: divan::Bencher, kind: &str) {
    let total = 100_000u64;
    bencher
        .with_inputs(|| if kind == "ring" { ring() } else { locked() })
        .bench_values(|queue| {
            let producer = {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..total {
                        let mut item = i;
                        while let Err(rejected) = queue.try_push(item) {
                            item = rejected;
                            thread::yield_now();
                        }
                    }
                })
            };

            let mut received = 0;
            while received < total {
                match queue.try_pop() {
                    Some(item) => {
                        black_box(item);
                        received += 1;
                    }
                    None => thread::yield_now(),
                }
            }
            producer.join().unwrap();
        });
}

#[divan::bench]
fn bench_blocking_burst(bencher: divan::Bencher) {
    let queue = LockedQueue::with_capacity(CAPACITY);
    bencher.bench_local(move || {
        for i in 0..BURST as u64 {
            queue.push_blocking(black_box(i), || false).unwrap();
        }
        queue.notify();
        for _ in 0..BURST {
            black_box(queue.pop_blocking(|| false));
        }
        queue.notify();
    });
}

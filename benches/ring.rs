//! # Ring — allocation cost and single-thread throughput
//!
//! **Real-world scenario**: sizing a ring for a hot loop that creates one
//! per connection, or pushes/pops as fast as a single thread can manage
//! with no contention.
//!
//! Compared against `crossbeam_channel::bounded`, the nearest off-the-shelf
//! MPMC alternative.
//!
//! The MPMC throughput bench sizes its producer/consumer count off
//! `num_cpus::get()` rather than a hardcoded thread count.

use corosync::Ring;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const CAPACITY: usize = 1024;

fn create(c: &mut Criterion) {
    c.bench_function("ring/create", |b| b.iter(|| Ring::<i32>::new(CAPACITY)));
    c.bench_function("ring/create_crossbeam", |b| {
        b.iter(|| crossbeam_channel::bounded::<i32>(CAPACITY))
    });
}

fn push_pop_round_trip(c: &mut Criterion) {
    let ring = Ring::<i32>::new(CAPACITY);
    c.bench_function("ring/push_pop_round_trip", |b| {
        b.iter(|| {
            ring.push(black_box(42)).unwrap();
            black_box(ring.pop().unwrap());
        })
    });

    let (tx, rx) = crossbeam_channel::bounded::<i32>(CAPACITY);
    c.bench_function("ring/push_pop_round_trip_crossbeam", |b| {
        b.iter(|| {
            tx.send(black_box(42)).unwrap();
            black_box(rx.recv().unwrap());
        })
    });
}

fn throughput_two_threads(c: &mut Criterion) {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    const TOTAL: usize = 100_000;

    c.bench_function("ring/throughput_two_threads", |b| {
        b.iter(|| {
            let ring = Arc::new(Ring::<usize>::new(CAPACITY));
            let remaining = Arc::new(AtomicUsize::new(TOTAL));

            let producer = {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..TOTAL {
                        loop {
                            if ring.push(i).is_ok() {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                })
            };

            let consumer = {
                let ring = ring.clone();
                let remaining = remaining.clone();
                thread::spawn(move || loop {
                    match ring.pop() {
                        Ok(v) => {
                            black_box(v);
                            if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                                break;
                            }
                        }
                        Err(_) => {
                            if remaining.load(Ordering::SeqCst) == 0 {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                })
            };

            producer.join().unwrap();
            consumer.join().unwrap();
        })
    });
}

/// Scales producer/consumer count to the host's core count, the way a real
/// MPMC workload would size itself rather than hardcoding a thread count
/// the bench happens to have been written on.
fn throughput_mpmc(c: &mut Criterion) {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    let sides = (num_cpus::get() / 2).max(1);
    const PER_PRODUCER: usize = 20_000;
    let total = sides * PER_PRODUCER;

    c.bench_function("ring/throughput_mpmc", |b| {
        b.iter(|| {
            let ring = Arc::new(Ring::<usize>::new(CAPACITY));
            let remaining = Arc::new(AtomicUsize::new(total));
            let consumed = Arc::new(Mutex::new(0usize));

            let producers: Vec<_> = (0..sides)
                .map(|p| {
                    let ring = ring.clone();
                    thread::spawn(move || {
                        let base = p * PER_PRODUCER;
                        for i in base..base + PER_PRODUCER {
                            loop {
                                if ring.push(i).is_ok() {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    })
                })
                .collect();

            let consumers: Vec<_> = (0..sides)
                .map(|_| {
                    let ring = ring.clone();
                    let remaining = remaining.clone();
                    let consumed = consumed.clone();
                    thread::spawn(move || loop {
                        match ring.pop() {
                            Ok(v) => {
                                black_box(v);
                                *consumed.lock().unwrap() += 1;
                                if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                                    break;
                                }
                            }
                            Err(_) => {
                                if remaining.load(Ordering::SeqCst) == 0 {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    })
                })
                .collect();

            for p in producers {
                p.join().unwrap();
            }
            for c in consumers {
                c.join().unwrap();
            }
        })
    });
}

criterion_group!(
    benches,
    create,
    push_pop_round_trip,
    throughput_two_threads,
    throughput_mpmc
);
criterion_main!(benches);

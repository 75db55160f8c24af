use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracesynth_ring::{Channel, Config};

const MSG_PER_PRODUCER: u64 = 1_000_000;
const BATCH_SIZE: usize = 1024;

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    group.bench_function("single_producer_consumer", |b| {
        b.iter(|| {
            let channel = Arc::new(Channel::<u32>::new(Config::default()));
            let producer = channel.register().unwrap();

            let ch = Arc::clone(&channel);
            let producer_handle = thread::spawn(move || {
                let mut sent = 0u64;
                while sent < MSG_PER_PRODUCER {
                    let want = BATCH_SIZE.min((MSG_PER_PRODUCER - sent) as usize);
                    if let Some(mut r) = producer.reserve(want) {
                        let len = {
                            let slice = r.as_mut_slice();
                            for (i, item) in slice.iter_mut().enumerate() {
                                item.write((sent + i as u64) as u32);
                            }
                            slice.len()
                        };
                        r.commit();
                        sent += len as u64;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut count = 0u64;
            while count < MSG_PER_PRODUCER {
                count += ch.consume_all(|item| {
                    black_box(item);
                }) as u64;
                if count < MSG_PER_PRODUCER {
                    std::hint::spin_loop();
                }
            }

            producer_handle.join().unwrap();
        });
    });

    group.finish();
}

fn bench_mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc");

    for num_producers in [2, 4].iter() {
        let total_msgs = MSG_PER_PRODUCER * (*num_producers as u64);
        group.throughput(Throughput::Elements(total_msgs));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n}P_{n}C", n = num_producers)),
            num_producers,
            |b, &n| {
                b.iter(|| {
                    let config = Config::new(16, n.max(16), false);
                    let channel = Arc::new(Channel::<u32>::new(config));

                    let mut producer_handles = vec![];
                    for _ in 0..n {
                        let ch = Arc::clone(&channel);
                        let handle = thread::spawn(move || {
                            let producer = ch.register().unwrap();
                            let mut sent = 0u64;
                            while sent < MSG_PER_PRODUCER {
                                let want = BATCH_SIZE.min((MSG_PER_PRODUCER - sent) as usize);
                                if let Some(mut r) = producer.reserve(want) {
                                    let len = {
                                        let slice = r.as_mut_slice();
                                        for (i, item) in slice.iter_mut().enumerate() {
                                            item.write((sent + i as u64) as u32);
                                        }
                                        slice.len()
                                    };
                                    r.commit();
                                    sent += len as u64;
                                } else {
                                    std::hint::spin_loop();
                                }
                            }
                        });
                        producer_handles.push(handle);
                    }

                    let consumed = Arc::new(AtomicU64::new(0));
                    let c = Arc::clone(&consumed);
                    let ch = Arc::clone(&channel);
                    let consumer_handle = thread::spawn(move || {
                        while c.load(Ordering::Relaxed) < total_msgs {
                            let n = ch.consume_all(|item| {
                                black_box(item);
                            });
                            c.fetch_add(n as u64, Ordering::Relaxed);
                            if n == 0 {
                                std::hint::spin_loop();
                            }
                        }
                    });

                    for handle in producer_handles {
                        handle.join().unwrap();
                    }
                    consumer_handle.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_spsc, bench_mpsc);
criterion_main!(benches);

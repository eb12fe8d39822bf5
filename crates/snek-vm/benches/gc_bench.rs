//! GC Performance Benchmarks
//!
//! Measures collection pause times and allocation throughput.
//!
//! Run with: `cargo bench -p snek-vm`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use snek_vm::Vm;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Benchmark GC pause time for various heap sizes, half of them rooted
fn gc_pause_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_pause");

    for num_objects in [100, 1000, 5000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("objects", num_objects),
            num_objects,
            |b, &n| {
                b.iter_custom(|iters| {
                    let mut total_duration = Duration::ZERO;

                    for _ in 0..iters {
                        let mut vm = Vm::new();
                        let frame = vm.new_frame().unwrap();
                        for i in 0..n {
                            let obj = vm.new_integer(i as i64).unwrap();
                            if i % 2 == 0 {
                                vm.frame_reference(frame, obj).unwrap();
                            }
                        }

                        let start = Instant::now();
                        black_box(vm.collect_garbage());
                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Benchmark allocation throughput
fn allocation_throughput_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation_throughput");

    group.bench_function("integers_1000", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            for i in 0..1000 {
                black_box(vm.new_integer(i).unwrap());
            }
        });
    });

    group.bench_function("strings_1000", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            for _ in 0..1000 {
                black_box(vm.new_string("I wish I knew how to read.").unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark mark phase over deep and wide vector graphs
fn gc_mark_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_mark");

    group.bench_function("deep_chain_1000", |b| {
        b.iter_custom(|iters| {
            let mut total_duration = Duration::ZERO;

            for _ in 0..iters {
                let mut vm = Vm::new();
                let frame = vm.new_frame().unwrap();
                let mut current = vm.new_integer(0).unwrap();
                for depth in 1..1000 {
                    let leaf = vm.new_integer(depth).unwrap();
                    current = vm.new_vector3(current, leaf, leaf).unwrap();
                }
                vm.frame_reference(frame, current).unwrap();

                let start = Instant::now();
                black_box(vm.collect_garbage());
                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.bench_function("shared_leaves_fanout_3", |b| {
        b.iter_custom(|iters| {
            let mut total_duration = Duration::ZERO;

            for _ in 0..iters {
                let mut vm = Vm::new();
                let frame = vm.new_frame().unwrap();
                let mut level = vec![vm.new_string("leaf").unwrap(); 3];
                for _ in 0..6 {
                    let mut next = Vec::with_capacity(level.len() * 3);
                    for _ in 0..level.len() * 3 {
                        next.push(vm.new_vector3(level[0], level[1], level[2]).unwrap());
                    }
                    level = next;
                }
                for &obj in &level {
                    vm.frame_reference(frame, obj).unwrap();
                }

                let start = Instant::now();
                black_box(vm.collect_garbage());
                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    gc_pause_benchmark,
    allocation_throughput_benchmark,
    gc_mark_benchmark
);
criterion_main!(benches);

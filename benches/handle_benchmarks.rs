//! Criterion benchmarks for rust_database_handle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_database_handle::core::statement::classify;
use rust_database_handle::core::{Tracer, TransactionType};
use rust_database_handle::prelude::*;
use std::sync::Arc;

fn open_memory() -> Handle {
    let mut handle = Handle::new(":memory:");
    handle.open().expect("Failed to open");
    handle
        .exec("CREATE TABLE bench (id INTEGER PRIMARY KEY, v INTEGER)")
        .expect("Failed to create table");
    handle
}

// ============================================================================
// Exec Benchmarks
// ============================================================================

fn bench_exec(c: &mut Criterion) {
    let mut group = c.benchmark_group("exec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("untraced", |b| {
        let handle = open_memory();
        b.iter(|| handle.exec(black_box("INSERT INTO bench (v) VALUES (1)")));
    });

    group.bench_function("sql_trace", |b| {
        let handle = open_memory();
        handle.set_sql_trace(Some(Arc::new(|sql: &str| {
            black_box(sql);
        })));
        b.iter(|| handle.exec(black_box("INSERT INTO bench (v) VALUES (1)")));
    });

    group.bench_function("performance_trace", |b| {
        let handle = open_memory();
        handle.set_performance_trace(Some(Arc::new(
            |tag: Tag, footprint: &Footprint, cost: u64| {
                black_box((tag, footprint.len(), cost));
            },
        )));
        b.iter(|| handle.exec(black_box("INSERT INTO bench (v) VALUES (1)")));
    });

    group.finish();
}

fn bench_transaction_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction_window");

    for size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let handle = open_memory();
            handle.set_performance_trace(Some(Arc::new(
                |tag: Tag, footprint: &Footprint, cost: u64| {
                    black_box((tag, footprint.len(), cost));
                },
            )));
            b.iter(|| {
                let tx = Transaction::begin(&handle).expect("begin");
                for _ in 0..size {
                    tx.exec("INSERT INTO bench (v) VALUES (1)").expect("insert");
                }
                tx.commit().expect("commit");
            });
        });
    }

    group.finish();
}

// ============================================================================
// Tracer Benchmarks
// ============================================================================

fn bench_tracer(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracer");

    group.bench_function("record_aggregating", |b| {
        let mut tracer = Tracer::new();
        tracer.transition(TransactionType::Begin, true);
        b.iter(|| tracer.record(black_box("SELECT 1"), black_box(100)));
    });

    group.bench_function("classify", |b| {
        b.iter(|| classify(black_box("  /* hint */ BEGIN IMMEDIATE TRANSACTION;")));
    });

    group.finish();
}

criterion_group!(benches, bench_exec, bench_transaction_window, bench_tracer);
criterion_main!(benches);

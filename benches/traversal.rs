//! Composite-cursor benchmarks.
//!
//! Measures the traversal surface against the in-memory backend: full
//! scans, point seeks, and chain-building puts over a 2-level index.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nestdb::{put, Cursor, MemStore};

const GROUP_SIZE: u32 = 100;

fn populate(entries: u32) -> MemStore {
    let store = MemStore::new();
    let mut tx = store.begin_write();
    for i in 0..entries {
        let group = format!("g{:04}", i / GROUP_SIZE);
        let member = format!("m{:06}", i);
        put(
            &mut tx,
            b"bench",
            &[group.as_bytes(), member.as_bytes()],
            b"payload",
        )
        .unwrap();
    }
    tx.commit().unwrap();
    store
}

fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_full_scan");
    for count in [1_000u32, 10_000] {
        let store = populate(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let tx = store.begin_read();
                let mut cur = Cursor::new(tx, b"bench".as_slice(), 2, false);
                cur.init(&[]).unwrap();
                let mut seen = 0u32;
                let mut hit = cur.first();
                while hit.is_some() {
                    seen += 1;
                    hit = cur.next();
                }
                assert_eq!(seen, count);
                black_box(seen)
            });
        });
    }
    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let store = populate(10_000);
    c.bench_function("cursor_seek_existing", |b| {
        let tx = store.begin_read();
        let mut cur = Cursor::new(tx, b"bench".as_slice(), 2, false);
        cur.init(&[]).unwrap();
        let mut i = 0u32;
        b.iter(|| {
            let target = (i * 7919) % 10_000;
            i = i.wrapping_add(1);
            let group = format!("g{:04}", target / GROUP_SIZE);
            let member = format!("m{:06}", target);
            let hit = cur.seek(&[group.as_bytes(), member.as_bytes()]);
            black_box(hit.is_some())
        });
    });
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_put");
    group.throughput(Throughput::Elements(1_000));
    group.bench_function("fresh_chains_1k", |b| {
        b.iter(|| {
            let store = MemStore::new();
            let mut tx = store.begin_write();
            for i in 0..1_000u32 {
                let group = format!("g{:04}", i / GROUP_SIZE);
                let member = format!("m{:06}", i);
                put(
                    &mut tx,
                    b"bench",
                    &[group.as_bytes(), member.as_bytes()],
                    b"payload",
                )
                .unwrap();
            }
            tx.commit().unwrap();
            black_box(store)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_full_scan, bench_seek, bench_put);
criterion_main!(benches);

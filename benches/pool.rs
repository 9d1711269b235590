use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pagestore::{MemoryProvider, PageManager, add_record};

const PAGE_SIZE: usize = 4096;

fn bench_pin_hit(c: &mut Criterion) {
    let mgr = PageManager::new(64, PAGE_SIZE, MemoryProvider::new(PAGE_SIZE)).unwrap();
    let id = mgr.new_pinned_page().unwrap().id();

    c.bench_function("pin_hit", |b| {
        b.iter(|| {
            let page = mgr.pin_page(black_box(id)).unwrap();
            black_box(page.id());
        })
    });
}

fn bench_pin_miss_evict(c: &mut Criterion) {
    // A pool far smaller than the working set, so every pin evicts
    let mgr = PageManager::new(8, PAGE_SIZE, MemoryProvider::new(PAGE_SIZE)).unwrap();
    let ids: Vec<_> = (0..64)
        .map(|_| mgr.new_pinned_page().unwrap().id())
        .collect();

    c.bench_function("pin_miss_evict", |b| {
        let mut i = 0;
        b.iter(|| {
            let page = mgr.pin_page(black_box(ids[i % ids.len()])).unwrap();
            black_box(page.id());
            i += 1;
        })
    });
}

fn bench_add_record(c: &mut Criterion) {
    let payload = [0xABu8; 64];

    c.bench_function("add_record_64b", |b| {
        b.iter_batched(
            || {
                let mgr =
                    PageManager::new(32, PAGE_SIZE, MemoryProvider::new(PAGE_SIZE)).unwrap();
                let first = mgr.new_pinned_page().unwrap().id();
                (mgr, first)
            },
            |(mgr, first)| {
                for _ in 0..100 {
                    add_record(&mgr, first, black_box(&payload)).unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_pin_hit, bench_pin_miss_evict, bench_add_record);
criterion_main!(benches);

//! Windowed partial sort vs. paging through a fully sorted array.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use heapgraph::snapshot::provider::ItemProvider;

/// Deterministic shuffle (xorshift) so runs compare like with like.
fn shuffled(n: u32) -> Vec<u32> {
    let mut data: Vec<u32> = (0..n).collect();
    let mut state = 0x9e3779b9u32;
    for i in (1..data.len()).rev() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        data.swap(i, state as usize % (i + 1));
    }
    data
}

fn bench_first_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_page");
    for &n in &[10_000u32, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let data = shuffled(n);
            let ascending = |a: u32, b: u32| a.cmp(&b);
            b.iter(|| {
                let mut provider = ItemProvider::new(data.clone());
                provider
                    .serialize_items_range(0, 50, Some(&ascending), |v| v)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_page_through(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_through_10");
    for &n in &[100_000u32] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let data = shuffled(n);
            let ascending = |a: u32, b: u32| a.cmp(&b);
            b.iter(|| {
                let mut provider = ItemProvider::new(data.clone());
                for page in 0..10 {
                    provider
                        .serialize_items_range(page * 50, (page + 1) * 50, Some(&ascending), |v| v)
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_first_page, bench_page_through);
criterion_main!(benches);

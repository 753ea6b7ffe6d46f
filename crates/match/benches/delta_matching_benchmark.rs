//! Benchmarks for block matching and delta replay.
//!
//! Run with: `cargo bench -p matching --bench delta_matching_benchmark`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use checksums::strong::Md4Seed;
use matching::{BlockLayout, BlockTable, Matcher, MatcherConfig};

/// Creates a reference and a copy with `change_percent` of its bytes altered.
fn create_test_data(size: usize, change_percent: u8) -> (Vec<u8>, Vec<u8>) {
    let reference: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let mut modified = reference.clone();

    let change_count = size * usize::from(change_percent) / 100;
    let seed = usize::from(change_percent) * 7919;
    for i in 0..change_count {
        let pos = (seed + i * 31337) % size;
        modified[pos] = modified[pos].wrapping_add(128);
    }

    (reference, modified)
}

fn bench_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_build");

    for size in [64 * 1024, 1024 * 1024] {
        let (reference, _) = create_test_data(size, 0);
        let layout = BlockLayout::for_file(size as u64, None).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &reference, |b, data| {
            b.iter(|| BlockTable::build(black_box(data), layout, Md4Seed::legacy(42)).unwrap());
        });
    }

    group.finish();
}

fn bench_find_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_matches");
    let size = 1024 * 1024;

    for change_percent in [0u8, 1, 10] {
        let (reference, modified) = create_test_data(size, change_percent);
        let layout = BlockLayout::for_file(size as u64, None).unwrap();
        let table = BlockTable::build(&reference, layout, Md4Seed::legacy(42)).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("blocks_only", change_percent),
            &modified,
            |b, input| {
                let matcher = Matcher::new(&table).with_config(MatcherConfig { extension_cap: 0 });
                b.iter(|| matcher.find_matches(black_box(input)).unwrap());
            },
        );
        group.bench_with_input(
            BenchmarkId::new("extended", change_percent),
            &modified,
            |b, input| {
                let matcher = Matcher::new(&table).with_reference(&reference);
                b.iter(|| matcher.find_matches(black_box(input)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    let size = 1024 * 1024;
    let (reference, modified) = create_test_data(size, 1);
    let layout = BlockLayout::for_file(size as u64, None).unwrap();
    let table = BlockTable::build(&reference, layout, Md4Seed::legacy(42)).unwrap();
    let script = Matcher::new(&table).find_matches(&modified).unwrap();

    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("one_percent_changed", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(size);
            script.replay(&reference, &mut out).unwrap();
            black_box(out)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_table_build, bench_find_matches, bench_replay);
criterion_main!(benches);

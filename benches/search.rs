use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mincov::{
    ConstantWeight, EngineConfig, FitzpatrickScott, find_minimizer, find_representative,
    generate_candidates, rank_endpoints,
};
use std::hint::black_box;

fn bench_search(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let fs = FitzpatrickScott::new(0.05).unwrap();

    let mut group = c.benchmark_group("search");
    group.sample_size(20);
    for &(n, k) in &[(8u64, 3usize), (12, 3), (6, 4)] {
        let grid = rank_endpoints(n, &fs, cfg.precision).unwrap();
        let set = generate_candidates(k - 1, &grid, &cfg).unwrap();
        let label = format!("n{n}_k{k}_c{}", set.len());

        group.bench_with_input(BenchmarkId::new("candidates", &label), &grid, |b, grid| {
            b.iter(|| black_box(generate_candidates(k - 1, black_box(grid), &cfg).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("minimax", &label), &set, |b, set| {
            b.iter(|| black_box(find_minimizer(n, black_box(set), &fs, &cfg).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("weighted", &label), &set, |b, set| {
            b.iter(|| {
                black_box(
                    find_representative(n, black_box(set), &fs, &ConstantWeight::default(), &cfg)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);

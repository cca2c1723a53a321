//! Fractalization benchmarks
//!
//! - Single-level and two-stage splits of a synthetic gene x phenotype matrix
//! - Mask resolution of a leaf against its parent
//! - Fold slicing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phenomatrix::matrix::{
    split_set, FractalizeOptions, Fractalizer, MaskResolver, NewMatrix, NodeId,
};
use phenomatrix::store::{MatrixStore, MemoryMatrixStore};

/// `genes` rows with three phenotypes each out of 500.
fn create_matrix(genes: u64) -> (MemoryMatrixStore, NodeId) {
    let store = MemoryMatrixStore::new();
    let root = store.insert_node(NewMatrix::root("Synthetic")).unwrap();
    for gene in 0..genes {
        for k in 0..3 {
            store
                .find_or_create_cell(root, gene, (gene * 7 + k * 131) % 500)
                .unwrap();
        }
    }
    (store, root)
}

fn bench_fractalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("fractalize");

    for genes in [1_000u64, 10_000] {
        for folds in [vec![10], vec![2, 5]] {
            let label = format!(
                "{genes}_genes/{}",
                folds.iter().map(ToString::to_string).collect::<Vec<_>>().join("x")
            );
            group.bench_function(BenchmarkId::from_parameter(label), |b| {
                b.iter_with_setup(
                    || create_matrix(genes),
                    |(store, root)| {
                        Fractalizer::new(&store, FractalizeOptions::default().seed(42))
                            .run(root, black_box(&folds))
                            .unwrap()
                    },
                );
            });
        }
    }

    group.finish();
}

fn bench_mask_resolution(c: &mut Criterion) {
    let (store, root) = create_matrix(10_000);
    Fractalizer::new(&store, FractalizeOptions::default().seed(42))
        .run(root, &[10])
        .unwrap();
    let leaf = store.children(root).unwrap()[0].id();
    let resolver = MaskResolver::new(&store);

    c.bench_function("effective_entries/leaf_of_10000", |b| {
        b.iter(|| resolver.effective_entries(black_box(leaf)).unwrap());
    });
}

fn bench_split_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_set");
    for size in [1_000usize, 100_000] {
        let items: Vec<u64> = (0..size as u64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| split_set(black_box(items), 10).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fractalize, bench_mask_resolution, bench_split_set);
criterion_main!(benches);

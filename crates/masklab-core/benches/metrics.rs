use criterion::{black_box, criterion_group, criterion_main, Criterion};

use masklab_core::metrics::evaluate;
use masklab_core::volume::{Volume, VolumeHeader};

fn make_masks(dim: usize) -> (Volume, Volume) {
    let header = VolumeHeader {
        shape: [dim, dim, dim],
        spacing_mm: [1.0, 1.0, 1.0],
        affine: VolumeHeader::identity_affine([1.0, 1.0, 1.0]),
    };
    let mut gold = Volume::blank(&header);
    let mut student = Volume::blank(&header);
    let half = dim / 2;
    for z in 0..half {
        for y in 0..half {
            for x in 0..half {
                gold.set(x, y, z, 1.0);
                // student overlaps but is shifted by one along x
                if x + 1 < dim {
                    student.set(x + 1, y, z, 1.0);
                }
            }
        }
    }
    (gold, student)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for dim in [16usize, 64, 128] {
        let (gold, student) = make_masks(dim);
        group.bench_function(format!("{dim}^3"), |b| {
            b.iter(|| evaluate(black_box(&gold), black_box(&student)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pkgversion_core::normalizer::normalize;

const INPUTS: [&str; 6] = [
    "1.2.3",
    "ge3b6e92",
    "1.2.3-99-ge3b6e92",
    "1.2.3-alpha4",
    "1.2.3-a4.post1.dev5-12-gabc1234",
    "non1.2.3.post1",
];

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize describe strings", |b| {
        b.iter(|| {
            for raw in INPUTS {
                black_box(normalize(black_box(raw)));
            }
        })
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);

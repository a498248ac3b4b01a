use bench::PRELUDE;
use criterion::{criterion_group, criterion_main, Criterion};
use lispc::{lexer, reader};
use std::hint::black_box;

fn criterion_benchmark(c: &mut Criterion) {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    c.bench_function("reader", |b| {
        b.iter(|| {
            tokens.clear();
            let forms = reader::read_all(black_box(PRELUDE), &mut tokens);
            black_box(forms).expect("prelude reads");
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

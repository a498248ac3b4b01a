use bench::PRELUDE;
use criterion::{criterion_group, criterion_main, Criterion};
use lispc::lexer;
use std::hint::black_box;

fn criterion_benchmark(c: &mut Criterion) {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    c.bench_function("lexer", |b| {
        b.iter(|| {
            tokens.clear();
            lexer::lex(black_box(PRELUDE), &mut tokens);
            black_box(tokens.len());
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

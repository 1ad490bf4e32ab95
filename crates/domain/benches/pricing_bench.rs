use std::hint::black_box;

use common::BookId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, OrderLine, PricingEngine};

fn make_lines(count: u32) -> Vec<OrderLine> {
    (0..count)
        .map(|i| {
            OrderLine::new(
                BookId::new(),
                format!("Book {i}"),
                (i % 5) + 1,
                Money::from_cents(500 + i64::from(i) * 37),
                (i % 4) as u8 * 10,
            )
        })
        .collect()
}

fn bench_price_single_line(c: &mut Criterion) {
    let engine = PricingEngine::default();
    let lines = make_lines(1);

    c.bench_function("pricing/single_line", |b| {
        b.iter(|| engine.price(black_box(&lines)));
    });
}

fn bench_price_typical_cart(c: &mut Criterion) {
    let engine = PricingEngine::default();
    let lines = make_lines(5);

    c.bench_function("pricing/five_lines", |b| {
        b.iter(|| engine.price(black_box(&lines)));
    });
}

fn bench_price_bulk_order(c: &mut Criterion) {
    let engine = PricingEngine::default();
    let lines = make_lines(100);

    c.bench_function("pricing/hundred_lines", |b| {
        b.iter(|| engine.price(black_box(&lines)));
    });
}

criterion_group!(
    benches,
    bench_price_single_line,
    bench_price_typical_cart,
    bench_price_bulk_order
);
criterion_main!(benches);

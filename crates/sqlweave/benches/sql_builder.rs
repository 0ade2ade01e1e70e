use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::prelude::*;
use sqlweave::{Bindings, PlaceholderStyle};

/// SELECT col0, col1, ... FROM t WHERE col0 = :col0 AND col1 = :col1 ...
fn select_with_conditions(n: usize) -> Select {
    let fields: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    (0..n).fold(qb::select("t").fields(fields), |q, i| {
        q.and_where(format!("col{i}"), i as i64)
    })
}

fn bench_build_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/build_select");

    for n in [1, 5, 10, 50, 100] {
        let q = select_with_conditions(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| {
                let mut bindings = Bindings::new();
                black_box(q.build(&mut bindings).ok());
            });
        });
    }

    group.finish();
}

fn bench_nested_sub_selects(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/nested_sub_selects");

    for depth in [1, 3, 5] {
        let q = (0..depth).fold(qb::select("t0").and_where("x", 0), |inner, d| {
            qb::select(format!("t{}", d + 1).as_str())
                .and_where("x", d + 1)
                .where_in_select("id", inner)
        });
        group.bench_with_input(BenchmarkId::from_parameter(depth), &q, |b, q| {
            b.iter(|| {
                let mut bindings = Bindings::new();
                black_box(q.build(&mut bindings).ok());
            });
        });
    }

    group.finish();
}

fn bench_multi_row_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/multi_row_insert");

    for n in [1, 10, 100, 500] {
        let q = (0..n).fold(qb::insert("users"), |q, i| {
            q.row([("name", Value::from(format!("user{i}"))), ("age", Value::from(i))])
        });
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| {
                let mut bindings = Bindings::new();
                black_box(q.build(&mut bindings).ok());
            });
        });
    }

    group.finish();
}

fn bench_to_positional(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/to_positional");

    for n in [1, 10, 100] {
        let q = select_with_conditions(n);
        let Ok(query) = q.compile().cloned() else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &query, |b, query| {
            b.iter(|| black_box(query.to_positional(PlaceholderStyle::Dollar)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_select,
    bench_nested_sub_selects,
    bench_multi_row_insert,
    bench_to_positional
);
criterion_main!(benches);

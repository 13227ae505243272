use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgdsl::{Column, Expr, Filter, ParamList, TableRef};

struct Paths {
    age: Column<i32>,
    name: Column<Option<String>>,
}

fn paths() -> Paths {
    let table = TableRef::new("member", "m");
    Paths {
        age: Column::new(&table, "age"),
        name: Column::new(&table, "username"),
    }
}

/// `n` optional conditions, every other one present.
fn conditions(p: &Paths, n: usize) -> Vec<Option<Expr>> {
    (0..n)
        .map(|i| match i % 4 {
            0 => Some(p.age.goe(i as i32)),
            1 => None,
            2 => Some(p.name.eq(format!("member{i}"))),
            _ => None,
        })
        .collect()
}

fn bench_compose(c: &mut Criterion) {
    let p = paths();
    let mut group = c.benchmark_group("filter/all_of");

    for n in [1, 4, 16, 64] {
        let conds = conditions(&p, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &conds, |b, conds| {
            b.iter(|| black_box(Filter::all_of(conds.iter().cloned())));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let p = paths();
    let mut group = c.benchmark_group("filter/build_sql");

    for n in [1, 4, 16, 64] {
        let filter = Filter::all_of(conditions(&p, n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &filter, |b, filter| {
            b.iter(|| {
                let mut params = ParamList::new();
                black_box(filter.expr().build(&mut params));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose, bench_render);
criterion_main!(benches);

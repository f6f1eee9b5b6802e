use std::{env, path::PathBuf};

use criterion::{criterion_group, criterion_main, Criterion};
use pargen::{build, grammar::Grammar, SimulateConfig, Variant};

criterion_main!(benches);
criterion_group!(benches, bench_arithmetic, bench_small, bench_simulate);

fn bench_arithmetic(c: &mut Criterion) {
    bench_table_gen(c, "arithmetic");
    bench_table_gen(c, "arithmetic_ll1");
}

fn bench_small(c: &mut Criterion) {
    bench_table_gen(c, "assignment");
    bench_table_gen(c, "dangling_else");
    bench_table_gen(c, "lr1_only");
    bench_table_gen(c, "nullable");
    bench_table_gen(c, "pairs");
}

fn load(grammar_name: &str) -> Grammar {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    Grammar::from_file(&project_root.join(format!("tests/{}.grammar", grammar_name))).unwrap()
}

fn bench_table_gen(c: &mut Criterion, grammar_name: &str) {
    let grammar = load(grammar_name);

    let mut group = c.benchmark_group(grammar_name);
    for variant in Variant::ALL {
        group.bench_function(variant.name(), |b| {
            b.iter(|| build(grammar.clone(), variant).unwrap());
        });
    }
    group.finish();
}

fn bench_simulate(c: &mut Criterion) {
    let input = "( id + id ) * id + id * ( id + ( id * id ) )";
    let config = SimulateConfig::default();

    let mut group = c.benchmark_group("simulate");
    for variant in [Variant::Slr1, Variant::Lalr1, Variant::Clr1] {
        let artifacts = build(load("arithmetic"), variant).unwrap();
        group.bench_function(variant.name(), |b| {
            b.iter(|| artifacts.parse(input, &config));
        });
    }
    let artifacts = build(load("arithmetic_ll1"), Variant::Ll1).unwrap();
    group.bench_function(Variant::Ll1.name(), |b| {
        b.iter(|| artifacts.parse(input, &config));
    });
    group.finish();
}

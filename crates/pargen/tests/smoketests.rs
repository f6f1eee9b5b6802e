use pargen::{
    build,
    grammar::Grammar,
    render::{self, Aliases},
    Outcome, SimulateConfig, Variant,
};
use std::{env, path::PathBuf};

fn load(name: &str) -> Grammar {
    Grammar::from_file(
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
            .join("tests")
            .join(format!("{}.grammar", name)),
    )
    .unwrap()
}

/// Build the table under every algorithm and render all the results.
macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();

            for variant in Variant::ALL {
                let artifacts = build(load(stringify!($name)), variant).unwrap();
                let g = artifacts.grammar();
                let aliases = Aliases::new();
                eprintln!("{}", render::first_follow(g, &aliases, artifacts.first_follow()));
                if let Some(automaton) = artifacts.automaton() {
                    eprintln!("{}", render::collection(g, &aliases, automaton));
                }
                match (artifacts.table(), artifacts.ll1_table()) {
                    (Some(table), None) => eprintln!("{}", render::lr_table(g, &aliases, table)),
                    (None, Some(table)) => eprintln!("{}", render::ll1_table(g, &aliases, table)),
                    _ => panic!("{} built no table", variant),
                }
            }
        }
    )*};
}

define_tests! {
    arithmetic,
    arithmetic_ll1,
    assignment,
    dangling_else,
    list,
    lr1_only,
    nullable,
    pairs,
}

fn conflicts(name: &str, variant: Variant) -> usize {
    build(load(name), variant).unwrap().conflict_count()
}

#[test]
fn conflict_matrix() {
    use Variant::*;
    #[rustfmt::skip]
    let expected = [
        //                 LL(1)  LR(0)  SLR(1) LALR(1) CLR(1)
        ("arithmetic",     [true,  true,  false, false,  false]),
        ("arithmetic_ll1", [false, true,  false, false,  false]),
        ("assignment",     [true,  true,  true,  false,  false]),
        ("dangling_else",  [true,  true,  true,  true,   true ]),
        ("list",           [false, true,  false, false,  false]),
        ("lr1_only",       [true,  true,  true,  true,   false]),
        ("nullable",       [false, true,  false, false,  false]),
        ("pairs",          [false, false, false, false,  false]),
    ];
    for (name, row) in expected {
        for (variant, has_conflicts) in [Ll1, Lr0, Slr1, Lalr1, Clr1].into_iter().zip(row) {
            assert_eq!(
                conflicts(name, variant) > 0,
                has_conflicts,
                "{} under {}",
                name,
                variant
            );
        }
    }
}

#[test]
fn sentences() {
    let cases: &[(&str, &[Variant], &[&str], &[&str])] = &[
        (
            "arithmetic",
            &[Variant::Slr1, Variant::Lalr1, Variant::Clr1],
            &["id", "id + id * id", "( id + id ) * id"],
            &["id + + id", "( id", "id )", ""],
        ),
        (
            "arithmetic_ll1",
            &[Variant::Ll1, Variant::Slr1, Variant::Clr1],
            &["id", "id + id * id", "( id + id ) * id"],
            &["id + + id", "( id", "id id"],
        ),
        (
            "pairs",
            &Variant::ALL,
            &["d d", "c d c c d", "c c d d"],
            &["d", "c c", "d d d"],
        ),
        (
            "list",
            &[Variant::Ll1, Variant::Slr1, Variant::Lalr1, Variant::Clr1],
            &["", "a", "a a a $"],
            &["$ a"],
        ),
        (
            "nullable",
            &[Variant::Ll1, Variant::Slr1, Variant::Lalr1, Variant::Clr1],
            &["c", "a c", "b c", "a b c"],
            &["b a c", "a b", "c c"],
        ),
        (
            "lr1_only",
            &[Variant::Clr1],
            &["a c d", "b c d", "a c e", "b c e"],
            &["a c", "c d", "a d"],
        ),
    ];

    let config = SimulateConfig::default();
    for (name, variants, accepted, rejected) in cases {
        for variant in *variants {
            let artifacts = build(load(name), *variant).unwrap();
            for input in *accepted {
                let trace = artifacts.parse(input, &config);
                assert_eq!(
                    trace.outcome(),
                    Outcome::Accepted,
                    "{} under {} on {:?}:\n{}",
                    name,
                    variant,
                    input,
                    trace
                );
            }
            for input in *rejected {
                let trace = artifacts.parse(input, &config);
                assert_eq!(
                    trace.outcome(),
                    Outcome::Rejected,
                    "{} under {} on {:?}:\n{}",
                    name,
                    variant,
                    input,
                    trace
                );
            }
        }
    }
}

#[test]
fn lalr_is_no_larger_than_clr() {
    for name in ["arithmetic", "assignment", "pairs", "lr1_only", "nullable"] {
        let lalr = build(load(name), Variant::Lalr1).unwrap();
        let clr = build(load(name), Variant::Clr1).unwrap();
        let lalr = lalr.automaton().unwrap();
        let clr = clr.automaton().unwrap();
        assert!(lalr.len() <= clr.len(), "{}", name);

        let merged: usize = lalr.states().iter().map(|s| s.merged_from().len()).sum();
        assert_eq!(merged, clr.len(), "{}", name);
    }
}

#[test]
fn lalr_merge_introduces_reduce_reduce() {
    let artifacts = build(load("lr1_only"), Variant::Lalr1).unwrap();
    let table = artifacts.table().unwrap();
    assert_eq!(table.shift_reduce_count(), 0);
    assert_eq!(table.reduce_reduce_count(), 2);
}

#[test]
fn slr_and_clr_counts_may_differ() {
    let slr = build(load("assignment"), Variant::Slr1).unwrap();
    let clr = build(load("assignment"), Variant::Clr1).unwrap();
    assert_eq!(slr.table().unwrap().shift_reduce_count(), 1);
    assert_eq!(clr.table().unwrap().shift_reduce_count(), 0);
}

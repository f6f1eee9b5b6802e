use anyhow::Context as _;
use clap::Parser;
use pargen::{render, render::Aliases, Grammar, SimulateConfig, Variant};
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The parsing algorithm: ll1, lr0, slr1, lalr1 or clr1.
    #[arg(long, default_value = "clr1")]
    algorithm: Variant,

    /// Whitespace-separated tokens to run through the generated table.
    #[arg(long)]
    input: Option<String>,

    /// The maximum number of simulation steps.
    #[arg(long, default_value_t = 1000)]
    max_steps: usize,

    /// Display text for a symbol, as `CODE=TEXT`. May be repeated.
    #[arg(long = "alias", value_parser = parse_alias)]
    aliases: Vec<(String, String)>,

    /// The path of grammar definition file.
    grammar: PathBuf,
}

fn parse_alias(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((code, text)) if !code.is_empty() => Ok((code.to_owned(), text.to_owned())),
        _ => Err(format!("expected CODE=TEXT, found `{}'", s)),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.grammar.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let in_file = fs::canonicalize(&args.grammar) //
        .context("failed to canonicalize the grammar file name")?;
    let grammar = Grammar::from_file(&in_file).context("failed to load the grammar")?;

    let empty_nonterminals: Vec<_> = grammar
        .unproductive_nonterminals()
        .map(|n| n.name().to_owned())
        .collect();
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    let aliases: Aliases = args.aliases.iter().cloned().collect();

    let s = Instant::now();
    let artifacts = pargen::build(grammar, args.algorithm)
        .with_context(|| anyhow::anyhow!("failed to build the {} table", args.algorithm))?;
    tracing::info!("build: {:?} elapsed", s.elapsed());

    let g = artifacts.grammar();
    println!("{}", g);

    println!("## First/Follow:");
    println!("{}", render::first_follow(g, &aliases, artifacts.first_follow()));

    if let Some(canonical) = artifacts.canonical() {
        println!("## canonical LR(1) collection ({} states):", canonical.len());
        println!("{}", render::collection(g, &aliases, canonical));
    }
    if let Some(automaton) = artifacts.automaton() {
        println!("## {} collection ({} states):", automaton.kind(), automaton.len());
        println!("{}", render::collection(g, &aliases, automaton));
    }

    println!("## {} table:", args.algorithm);
    if let Some(table) = artifacts.table() {
        println!("{}", render::lr_table(g, &aliases, table));
        println!(
            "shift/reduce conflicts: {}, reduce/reduce conflicts: {}",
            table.shift_reduce_count(),
            table.reduce_reduce_count()
        );
        for conflict in table.conflicts() {
            println!(
                "[warning] {} conflict in state {} on `{}': {}",
                conflict.kind,
                table.label(conflict.state),
                aliases.get(g.symbol_name(conflict.symbol)),
                table
                    .action(conflict.state, conflict.symbol)
                    .map(|action| action.display(table).to_string())
                    .unwrap_or_default()
            );
        }
    }
    if let Some(table) = artifacts.ll1_table() {
        println!("{}", render::ll1_table(g, &aliases, table));
        println!("LL(1) conflicts: {}", table.conflicts().len());
        for conflict in table.conflicts() {
            let productions: Vec<_> = conflict
                .productions
                .iter()
                .map(|p| render::production(g, &aliases, g.production(*p)).to_string())
                .collect();
            println!(
                "[warning] conflict on [{}, {}]: {}",
                aliases.get(g.nonterminal_name(conflict.nonterminal)),
                aliases.get(g.terminal_name(conflict.terminal)),
                productions.join(" / ")
            );
        }
    }

    if let Some(input) = &args.input {
        let mut config = SimulateConfig::new();
        config.max_steps(args.max_steps);

        let trace = artifacts.parse(input, &config);
        println!("\n## simulation of `{}':", input);
        print!("{}", trace);
        println!("outcome: {:?}", trace.outcome());
        if let Some(tree) = trace.tree() {
            println!("\n## parse tree:");
            print!("{}", tree.display(g));
        }
    }

    Ok(())
}

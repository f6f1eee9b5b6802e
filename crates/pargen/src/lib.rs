//! Parsing table generator for LL(1), LR(0), SLR(1), LALR(1) and canonical LR(1) grammars.

pub mod automaton;
pub mod build;
pub mod engine;
pub mod first_follow;
pub mod grammar;
pub mod item;
pub mod lalr;
pub mod ll1;
pub mod predictive;
pub mod render;
pub mod syntax;
pub mod table;
pub mod trace;
pub mod types;
pub mod util;

pub use crate::{
    build::{build, BuildError, BuiltArtifacts, Variant},
    grammar::{Grammar, GrammarError},
    trace::{Outcome, SimulateConfig, Trace},
};
